use chipo::asm::{assemble, listing, parse, Form};
use chipo::compile;
use chipo::error::ChipoError;

const PROGRAM: &str = r#"
; Bounce a single pixel across the screen.
WIDTH   = 64
SPEED   EQU STEP * 2
STEP    EQU 1

start:  cls
        ld   i, dot
        ld   v0, 0
        ld   v1, HEIGHT / 2
loop:   draw v0, v1, 1
        add  v0, SPEED
        se   v0, WIDTH
        jp   loop
        exit
dot:    db   $1.......
HEIGHT  EQU 32
"#;

#[test]
fn test_program() {
    let image = compile(PROGRAM).unwrap();
    assert_eq!(
        image,
        vec![
            0x00, 0xE0, // cls
            0xA2, 0x12, // ld i, dot
            0x60, 0x00, // ld v0, 0
            0x61, 0x10, // ld v1, 16
            0xD0, 0x11, // draw v0, v1, 1
            0x70, 0x02, // add v0, 2
            0x30, 0x40, // se v0, 64
            0x12, 0x08, // jp loop
            0x00, 0xFD, // exit
            0x80, // dot
        ]
    );
}

#[test]
fn test_statements_after_assembly() {
    let mut statements = parse(PROGRAM);
    assemble(&mut statements).unwrap();

    let loop_line = statements
        .iter()
        .find(|s| s.defined_name.as_deref() == Some("LOOP"))
        .unwrap();
    assert_eq!(loop_line.pc, Some(0x208));
    assert_eq!(loop_line.defined_value, Some(0x208));
    assert_eq!(loop_line.form, Some(Form::Draw));
    assert_eq!(loop_line.value, vec![0xD0, 0x11]);

    let text = listing(&statements);
    assert!(text.contains("0208  D0 11       loop:   draw v0, v1, 1"));
}

#[test]
fn test_failure_reports_every_line() {
    let source = "ld v0, 256\nbad bad\nld v1, 1\ncall nowhere\nld v1, 2 + ";
    let mut statements = parse(source);
    let err = assemble(&mut statements).unwrap_err();
    assert_eq!(err.syntax_errors, 2);
    assert_eq!(err.expression_errors, 0);

    let lines: Vec<usize> = err.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 5]);

    // Once the syntax is fixed the expression errors surface.
    let source = "ld v0, 256\nld v1, 1\ncall nowhere";
    match compile(source) {
        Err(ChipoError::Assembly(err)) => {
            assert_eq!(err.syntax_errors, 0);
            assert_eq!(err.expression_errors, 2);
            assert_eq!(err.diagnostics[1].message, "Undefined name NOWHERE");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_strings() {
    assert_eq!(compile("da 'MA''AM'").unwrap(), b"MA'AM".to_vec());
    assert_eq!(compile("da 'abc'").unwrap(), b"ABC".to_vec());
}

#[test]
fn test_case_insensitive() {
    assert_eq!(
        compile("Loop: JP loop").unwrap(),
        compile("LOOP: jp LOOP").unwrap()
    );
}

#[test]
fn test_schip_forms() {
    let image = compile("high\nscd 3\nscr\nscl\nldh i, v2\nlow\nexit").unwrap();
    assert_eq!(
        image,
        vec![0x00, 0xFF, 0x00, 0xC3, 0x00, 0xFB, 0x00, 0xFC, 0xF2, 0x30, 0x00, 0xFE, 0x00, 0xFD]
    );
}

#[test]
fn test_every_register_form() {
    let source = r#"
        add i, v1
        add v1, v2
        and v1, v2
        or v1, v2
        xor v1, v2
        sub v1, v2
        subn v1, v2
        shr v1, v2
        shl v1
        ld v1, v2
        ld v1, dt
        ld dt, v1
        ld st, v1
        ld v1, k
        ldc i, v1
        ldm v1
        stm v1
        std v1
        se v1, v2
        sne v1, v2
        skp v1
        sknp v1
    "#;
    let words: Vec<u16> = compile(source)
        .unwrap()
        .chunks(2)
        .map(|pair| (pair[0] as u16) << 8 | pair[1] as u16)
        .collect();
    assert_eq!(
        words,
        vec![
            0xF11E, 0x8124, 0x8122, 0x8121, 0x8123, 0x8125, 0x8127, 0x8126, 0x811E, 0x8120,
            0xF107, 0xF115, 0xF118, 0xF10A, 0xF129, 0xF165, 0xF155, 0xF133, 0x5120, 0x9120,
            0xE19E, 0xE1A1,
        ]
    );
}

#[test]
fn test_reservations_and_origins_are_checked() -> Result<(), String> {
    let cases = vec![
        ("ds size\nsize equ 4", "Undefined name SIZE"),
        ("ds 0 - 1", "Inappropriate expression value -1"),
        ("org #100", "Inappropriate expression value 256"),
    ];
    for (source, message) in cases {
        let mut statements = parse(source);
        let err = match assemble(&mut statements) {
            Err(err) => err,
            Ok(image) => return Err(format!("{:?} assembled to {:?}", source, image)),
        };
        if err.expression_errors != 1 || statements[0].error_msg != message {
            return Err(format!("{:?}: {:?}", source, err));
        }
    }
    Ok(())
}

#[test]
fn test_mnemonic_names() {
    let image = compile("call sub\nexit\nsub: ret\ndraw: jp draw").unwrap();
    assert_eq!(image, vec![0x22, 0x04, 0x00, 0xFD, 0x00, 0xEE, 0x12, 0x06]);
}
