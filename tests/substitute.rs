use gogrep::Matcher;

#[test]
fn rewrites_call_in_place() {
    let mut m = Matcher::new();
    let src = "{ a(); fmt.Println(x); b() }";
    let root = m.parse_pattern(src).unwrap();
    let pipe = m
        .compile(&[
            ("x", "fmt.Println($x)"),
            ("s", "log.Printf(\"%v\", $x)"),
        ])
        .unwrap();
    let ms = m.run(&pipe, root).unwrap();
    assert_eq!(ms.len(), 1);

    let now = m.compile(&[("x", "log.Printf(\"%v\", x)")]).unwrap();
    assert_eq!(m.run(&now, root).unwrap().len(), 1);
    let gone = m.compile(&[("x", "fmt.Println($_)")]).unwrap();
    assert!(m.run(&gone, root).unwrap().is_empty());
}

#[test]
fn swaps_captured_arguments() {
    let mut m = Matcher::new();
    let root = m.parse_pattern("f(1, 2)").unwrap();
    let pipe = m
        .compile(&[("x", "f($x, $y)"), ("s", "f($y, $x)")])
        .unwrap();
    let ms = m.run(&pipe, root).unwrap();
    assert_eq!(ms.len(), 1);

    let expected = m.parse_pattern("f(2, 1)").unwrap();
    assert!(m.struct_eq(ms[0].node, expected));
}

#[test]
fn splices_captured_runs_into_argument_lists() {
    let mut m = Matcher::new();
    let src = "{ f(1, 2, 3) }";
    let root = m.parse_pattern(src).unwrap();
    let pipe = m.compile(&[("x", "f($*a)"), ("s", "h($*a)")]).unwrap();
    assert_eq!(m.run(&pipe, root).unwrap().len(), 1);

    let now = m.compile(&[("x", "h(1, 2, 3)")]).unwrap();
    assert_eq!(m.run(&now, root).unwrap().len(), 1);
}

#[test]
fn extends_captured_argument_lists() {
    let mut m = Matcher::new();
    let src = "{ f(1, 2) }";
    let root = m.parse_pattern(src).unwrap();
    let pipe = m
        .compile(&[("x", "f($*a)"), ("s", "f($*a, extra)")])
        .unwrap();
    assert_eq!(m.run(&pipe, root).unwrap().len(), 1);

    let now = m.compile(&[("x", "f(1, 2, extra)")]).unwrap();
    assert_eq!(m.run(&now, root).unwrap().len(), 1);
}

#[test]
fn replaces_statement_window_with_wrapped_expression() {
    let mut m = Matcher::new();
    let src = "{ z(); a(); b() }";
    let root = m.parse_pattern(src).unwrap();
    let pipe = m.compile(&[("x", "a(); b()"), ("s", "c()")]).unwrap();
    assert_eq!(m.run(&pipe, root).unwrap().len(), 1);

    let now = m.compile(&[("x", "{ z(); c() }")]).unwrap();
    assert_eq!(m.run(&now, root).unwrap().len(), 1);
    let gone = m.compile(&[("x", "a()")]).unwrap();
    assert!(m.run(&gone, root).unwrap().is_empty());
}

#[test]
fn substituting_the_pattern_back_preserves_structure() {
    let mut m = Matcher::new();
    let src = "{ f(a); g(c); h(d) }";
    let root = m.parse_pattern(src).unwrap();
    let reference = m.parse_pattern(src).unwrap();
    let pipe = m.compile(&[("x", "g($x)"), ("s", "g($x)")]).unwrap();
    assert_eq!(m.run(&pipe, root).unwrap().len(), 1);
    assert!(m.struct_eq(root, reference));
}

#[test]
fn unbound_replacement_wildcard_is_an_error() {
    let mut m = Matcher::new();
    let root = m.parse_pattern("f(1)").unwrap();
    let pipe = m.compile(&[("x", "f($x)"), ("s", "g($nope)")]).unwrap();
    assert!(m.run(&pipe, root).is_err());
}

#[test]
fn replacement_may_be_a_bare_wildcard() {
    let mut m = Matcher::new();
    let src = "{ wrap(inner) }";
    let root = m.parse_pattern(src).unwrap();
    let pipe = m.compile(&[("x", "wrap($x)"), ("s", "$x")]).unwrap();
    assert_eq!(m.run(&pipe, root).unwrap().len(), 1);

    let now = m.compile(&[("x", "{ inner }")]).unwrap();
    assert_eq!(m.run(&now, root).unwrap().len(), 1);
}
