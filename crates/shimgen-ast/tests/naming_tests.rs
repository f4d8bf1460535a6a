use shimgen_ast::naming::*;

#[test]
fn test_default_names() {
    let config = NamingConfig::default();
    assert_eq!(config.shim_name("Fade"), "Fade_pointerized");
    assert_eq!(config.alloc_name("Vector3"), "malloc_Vector3");
    assert_eq!(config.free_name("Vector3"), "free_Vector3");
}

#[test]
fn test_configured_names() {
    let config = NamingConfig::new()
        .with_shim_suffix("_byref")
        .with_alloc_prefix("rl_new_")
        .with_free_prefix("rl_free_");
    assert_eq!(config.shim_name("DrawRay"), "DrawRay_byref");
    assert_eq!(config.alloc_name("Ray"), "rl_new_Ray");
    assert_eq!(config.free_name("Ray"), "rl_free_Ray");
}

#[test]
fn test_ts_identifier() {
    assert_eq!(ts_identifier("fileName"), "fileName");
    assert_eq!(ts_identifier("function"), "function_");
    assert_eq!(ts_identifier("delete"), "delete_");
    assert_eq!(ts_identifier("this"), "this_");
    // Only exact matches are renamed.
    assert_eq!(ts_identifier("newValue"), "newValue");
}

#[test]
fn test_ts_identifier_module_names() {
    assert_eq!(ts_identifier("lib"), "lib_");
    assert_eq!(ts_identifier("cstr"), "cstr_");
    assert_eq!(ts_identifier("registry"), "registry_");
    assert_eq!(ts_identifier("expectPointer"), "expectPointer_");
    assert_eq!(ts_identifier("raw_"), "raw__");
    assert_eq!(ts_identifier("library"), "library");
}

#[test]
fn test_library_name_for_header() {
    assert_eq!(library_name_for_header("raylib.h"), "raylib_pointerized");
    assert_eq!(library_name_for_header("/usr/include/raylib.h"), "raylib_pointerized");
    assert_eq!(library_name_for_header("C:\\raylib\\src\\raylib.h"), "raylib_pointerized");
    assert_eq!(library_name_for_header("vendor/miniaudio"), "miniaudio_pointerized");
}
