use shimgen_ast::{Declaration, Macro, Statement, Tag, TypeSpec, TypedefTarget};
use shimgen_parser::*;

#[test]
fn test_parse_simple_function() {
    let src = r#"
        RLAPI void ClearBackground(Color color);
    "#;
    let header = parse_header(src).unwrap();
    let functions: Vec<_> = header.functions().collect();
    assert_eq!(functions.len(), 1);
    let f = functions[0];
    assert_eq!(f.name, "ClearBackground");
    assert_eq!(f.annotations, vec!["RLAPI".to_string()]);
    assert!(f.signature.returns_void());
    assert_eq!(f.params().len(), 1);
    assert_eq!(f.params()[0].name, "color");
    assert_eq!(f.params()[0].ty, TypeSpec::named("Color"));
    assert_eq!(f.params()[0].pointer_depth, 0);
}

#[test]
fn test_parse_void_params() {
    let header = parse_header("int GetFPS(void);").unwrap();
    let f = header.functions().next().unwrap();
    assert!(f.params().is_empty());
    assert!(!f.is_variadic());
}

#[test]
fn test_parse_pointers_and_const() {
    let src = "RLAPI const char *GetClipboardText(void);\nRLAPI void SetWindowTitle(const char *title);";
    let header = parse_header(src).unwrap();
    let functions: Vec<_> = header.functions().collect();
    assert_eq!(functions[0].signature.return_pointer_depth, 1);
    assert!(functions[0].signature.return_type.is_const);
    let title = &functions[1].params()[0];
    assert_eq!(title.ty, TypeSpec::named("char").with_const());
    assert_eq!(title.pointer_depth, 1);
}

#[test]
fn test_parse_unsigned_and_double_pointer() {
    let src = "void Load(unsigned char **data, unsigned int count);";
    let header = parse_header(src).unwrap();
    let f = header.functions().next().unwrap();
    assert_eq!(f.params()[0].ty, TypeSpec::named("char").with_unsigned());
    assert_eq!(f.params()[0].pointer_depth, 2);
    assert_eq!(f.params()[1].ty, TypeSpec::named("int").with_unsigned());
}

#[test]
fn test_parse_variadic() {
    let src = "RLAPI void TraceLog(int logLevel, const char *text, ...);";
    let header = parse_header(src).unwrap();
    let f = header.functions().next().unwrap();
    assert!(f.is_variadic());
    assert_eq!(f.params().len(), 2);
}

#[test]
fn test_parse_unnamed_params() {
    let src = "void Blend(Color, float);";
    let header = parse_header(src).unwrap();
    let f = header.functions().next().unwrap();
    let names: Vec<&str> = f.params().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["arg0", "arg1"]);
    assert_eq!(f.params()[0].ty, TypeSpec::named("Color"));
}

#[test]
fn test_parse_array_param() {
    let src = "void SetShaderValues(int locs[4], float values[]);";
    let header = parse_header(src).unwrap();
    let f = header.functions().next().unwrap();
    assert_eq!(f.params()[0].array_len.as_deref(), Some("4"));
    assert_eq!(f.params()[1].array_len.as_deref(), Some(""));
    assert_eq!(f.params()[0].effective_depth(), 1);
}

#[test]
fn test_parse_typedef_struct() {
    let src = r#"
        // Color, 4 components, R8G8B8A8 (32bit)
        typedef struct Color {
            unsigned char r;        // Color red value
            unsigned char g;
            unsigned char b;
            unsigned char a;
        } Color;
    "#;
    let header = parse_header(src).unwrap();
    let def = header.structs().next().unwrap();
    assert_eq!(def.name, "Color");
    assert_eq!(def.tag.as_deref(), Some("Color"));
    assert!(def.is_typedef);
    assert!(!def.is_union);
    let names: Vec<&str> = def.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["r", "g", "b", "a"]);
    assert_eq!(def.fields[0].ty, TypeSpec::named("char").with_unsigned());
    assert_eq!(def.position.line, 3);
}

#[test]
fn test_parse_multi_declarator_fields() {
    let src = r#"
        typedef struct Matrix {
            float m0, m4, m8, m12;
            float m1, m5, m9, m13;
        } Matrix;
    "#;
    let header = parse_header(src).unwrap();
    let def = header.structs().next().unwrap();
    assert_eq!(def.fields.len(), 8);
    assert_eq!(def.fields[3].name, "m12");
    assert_eq!(def.fields[4].name, "m1");
}

#[test]
fn test_parse_field_forms() {
    let src = r#"
        typedef struct Mixed {
            char name[32];
            struct Mixed *next;
            unsigned int flags : 3;
            void (*callback)(int value);
        } Mixed;
    "#;
    let header = parse_header(src).unwrap();
    let def = header.structs().next().unwrap();
    assert_eq!(def.fields[0].array_len.as_deref(), Some("32"));
    assert_eq!(def.fields[1].ty, TypeSpec::named("Mixed").with_tag(Tag::Struct));
    assert_eq!(def.fields[1].pointer_depth, 1);
    assert_eq!(def.fields[2].bit_width.as_deref(), Some("3"));
    let callback = def.fields[3].function_pointer.as_ref().unwrap();
    assert_eq!(callback.params[0].name, "value");
    assert_eq!(def.fields[3].name, "callback");
}

#[test]
fn test_parse_union() {
    let src = "typedef union Value { int i; float f; } Value;";
    let header = parse_header(src).unwrap();
    let def = header.structs().next().unwrap();
    assert!(def.is_union);
    assert_eq!(def.fields.len(), 2);
}

#[test]
fn test_parse_bare_struct_and_forward_declaration() {
    let src = "struct Node;\nstruct Node { int value; struct Node *next; };";
    let header = parse_header(src).unwrap();
    assert!(matches!(
        &header.declarations[0],
        Declaration::Statement(Statement::ForwardDeclaration { ty }) if ty.name == "Node"
    ));
    let def = header.structs().next().unwrap();
    assert_eq!(def.name, "Node");
    assert!(!def.is_typedef);
    assert_eq!(def.spelled(), "struct Node");
}

#[test]
fn test_parse_enum_values_kept_raw() {
    let src = r#"
        typedef enum {
            FLAG_VSYNC_HINT = 0x00000040,   // Set to try enabling V-Sync on GPU
            FLAG_SHIFTED = (1 << 2),
            FLAG_NEXT,
        } ConfigFlags;
    "#;
    let header = parse_header(src).unwrap();
    let Declaration::EnumDef(def) = &header.declarations[0] else {
        panic!("expected enum, got {:?}", header.declarations[0]);
    };
    assert_eq!(def.name.as_deref(), Some("ConfigFlags"));
    assert_eq!(def.variants.len(), 3);
    assert_eq!(def.variants[0].value.as_deref(), Some("0x00000040"));
    assert_eq!(def.variants[1].value.as_deref(), Some("(1 << 2)"));
    assert_eq!(def.variants[2].value, None);
}

#[test]
fn test_parse_typedef_alias_and_callback() {
    let src = r#"
        typedef Vector4 Quaternion;
        typedef struct rAudioBuffer rAudioBuffer;
        typedef void (*TraceLogCallback)(int logLevel, const char *text, va_list args);
        typedef unsigned char *(*LoadFileDataCallback)(const char *fileName, int *dataSize);
    "#;
    let header = parse_header(src).unwrap();
    let typedefs: Vec<_> = header
        .walk()
        .filter_map(|d| match d {
            Declaration::Typedef(td) => Some(td),
            _ => None,
        })
        .collect();
    assert_eq!(typedefs.len(), 4);
    assert!(matches!(
        &typedefs[0].target,
        TypedefTarget::Type { ty, pointer_depth: 0, .. } if ty.name == "Vector4"
    ));
    assert!(matches!(
        &typedefs[1].target,
        TypedefTarget::Type { ty, .. } if ty.tag == Some(Tag::Struct)
    ));
    let TypedefTarget::FunctionPointer(sig) = &typedefs[2].target else {
        panic!("expected function pointer typedef");
    };
    assert_eq!(typedefs[2].name, "TraceLogCallback");
    assert_eq!(sig.params.len(), 3);
    let TypedefTarget::FunctionPointer(sig) = &typedefs[3].target else {
        panic!("expected function pointer typedef");
    };
    assert_eq!(sig.return_pointer_depth, 1);
}

#[test]
fn test_parse_macro_blocks_all_branches() {
    let src = r#"
        #ifndef RAYLIB_H
        #define RAYLIB_H
        #if defined(_WIN32)
            #define RLAPI __declspec(dllexport)
        #else
            #define RLAPI
        #endif
        #if defined(__cplusplus)
        extern "C" {
        #endif
        RLAPI void InitWindow(int width, int height, const char *title);
        #if defined(__cplusplus)
        }
        #endif
        #endif // RAYLIB_H
    "#;
    let header = parse_header(src).unwrap();
    assert_eq!(header.declarations.len(), 1);
    let Declaration::Macro(Macro::Block(block)) = &header.declarations[0] else {
        panic!("expected macro block");
    };
    assert_eq!(block.directive, "ifndef");
    assert_eq!(block.condition, "RAYLIB_H");
    let defines = header
        .walk()
        .filter(|d| matches!(d, Declaration::Macro(Macro::Define { name, .. }) if name == "RLAPI"))
        .count();
    assert_eq!(defines, 2);
    assert_eq!(header.functions().count(), 1);
}

#[test]
fn test_parse_function_like_define_with_continuation() {
    let src = "#define CLITERAL(type) \\\n    (type)\n";
    let header = parse_header(src).unwrap();
    let Declaration::Macro(Macro::Define { name, params, body }) = &header.declarations[0] else {
        panic!("expected define");
    };
    assert_eq!(name, "CLITERAL");
    assert_eq!(params.as_deref(), Some(&["type".to_string()][..]));
    assert_eq!(body, "(type)");
}

#[test]
fn test_parse_includes() {
    let header = parse_header("#include <stdarg.h>\n#include \"raymath.h\"\n").unwrap();
    let includes: Vec<_> = header
        .walk()
        .filter_map(|d| match d {
            Declaration::Include(inc) => Some((inc.path.as_str(), inc.system)),
            _ => None,
        })
        .collect();
    assert_eq!(includes, [("stdarg.h", true), ("raymath.h", false)]);
}

#[test]
fn test_parse_inline_definition_skipped() {
    let src = r#"
        static inline float Clamp(float value, float min, float max)
        {
            float result = (value < min)? min : value;
            if (result > max) { result = max; }
            return result;
        }
        RLAPI int GetFPS(void);
    "#;
    let header = parse_header(src).unwrap();
    let functions: Vec<_> = header.functions().collect();
    assert_eq!(functions.len(), 2);
    assert!(functions[0].has_body);
    assert_eq!(functions[0].annotations, vec!["static".to_string(), "inline".to_string()]);
    assert_eq!(functions[1].name, "GetFPS");
}

#[test]
fn test_parse_variables() {
    let src = "extern int counter;\nstatic const char *names[] = { \"a\", \"b\" };\nenum Mode mode;";
    let header = parse_header(src).unwrap();
    assert_eq!(header.declarations.len(), 3);
    assert!(header
        .declarations
        .iter()
        .all(|d| matches!(d, Declaration::Statement(Statement::Variable { .. }))));
}

#[test]
fn test_parse_empty_and_comment_only() {
    assert!(parse_header("").unwrap().declarations.is_empty());
    assert!(parse_header("  /* nothing */ // here\n").unwrap().declarations.is_empty());
}

#[test]
fn test_unterminated_macro_block() {
    let src = "int a;\n#ifdef FOO\nvoid f(void);\n";
    let err = parse_header(src).unwrap_err();
    match err {
        ParseError::UnterminatedMacroBlock {
            open_position,
            directive,
        } => {
            assert_eq!(directive, "ifdef");
            assert_eq!(open_position.line, 2);
            assert_eq!(open_position.column, 1);
        }
        other => panic!("expected unterminated block, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_position() {
    let src = "void ok(void);\nvoid broken(int a;\n";
    let err = parse_header(src).unwrap_err();
    let ParseError::Syntax { position, expected } = &err else {
        panic!("expected syntax error, got {:?}", err);
    };
    assert_eq!(position.line, 2);
    assert!(!expected.is_empty());
    assert!(err.to_string().starts_with("2:"), "message: {}", err);
}

#[test]
fn test_stray_endif_is_error() {
    let err = parse_header("#endif\n").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { .. }));
}

#[test]
fn test_parse_deterministic() {
    let src = "typedef struct V { float x, y; } V;\nV Add(V a, V b);";
    assert_eq!(parse_header(src), parse_header(src));
}

#[test]
fn test_block_comment_spanning_lines_after_directive() {
    let src = "\
#ifdef A
int f(void);
#endif /* A
          continues here */
#define MAX 4 /* upper
                 bound */
int g(void);
";
    let header = parse_header(src).unwrap();
    let names: Vec<_> = header.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["f", "g"]);
    assert!(header.declarations.iter().any(|d| matches!(
        d,
        Declaration::Macro(Macro::Define { name, body, .. }) if name == "MAX" && body == "4"
    )));
}
