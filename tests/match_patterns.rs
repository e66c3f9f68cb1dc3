use gogrep::{Lenience, Matcher, NodeRef};

fn matches_with(lenience: Lenience, cmds: &[(&str, &str)], target: &str) -> Vec<String> {
    let mut m = Matcher::new();
    m.lenience = lenience;
    let pipeline = m.compile(cmds).expect("pattern compiles");
    let root = m.parse_pattern(target).expect("target parses");
    let found = m.run(&pipeline, root).expect("pipeline runs");
    found
        .into_iter()
        .map(|mt| m.span_text(target, mt.node).to_string())
        .collect()
}

fn matches(cmds: &[(&str, &str)], target: &str) -> Vec<String> {
    matches_with(Lenience::default(), cmds, target)
}

#[test]
fn wildcard_matches_every_position() {
    let got = matches(&[("x", "$x")], "a + b; c");
    assert_eq!(got, vec!["a + b", "a + b; c", "a", "b", "c"]);
}

#[test]
fn repeated_wildcard_requires_equal_bindings() {
    assert_eq!(matches(&[("x", "$x + $x")], "a + a"), vec!["a + a"]);
    assert!(matches(&[("x", "$x + $x")], "a + b").is_empty());
}

#[test]
fn bound_value_is_recorded() {
    let mut m = Matcher::new();
    let pipe = m.compile(&[("x", "$x + $x")]).unwrap();
    let src = "a + a";
    let root = m.parse_pattern(src).unwrap();
    let ms = m.run(&pipe, root).unwrap();
    assert_eq!(ms.len(), 1);
    let x = m.sym("x");
    let bound = ms[0].values.get(&x).copied().expect("x is bound");
    assert_eq!(m.span_text(src, bound), "a");
}

#[test]
fn variadics_absorb_prefix_and_suffix() {
    assert_eq!(matches(&[("x", "$*_, b, $*_")], "f(a, b, c)"), vec!["a, b, c"]);
}

#[test]
fn variadic_at_end_and_empty_capture() {
    assert_eq!(matches(&[("x", "f($*a)")], "f(a, b)"), vec!["f(a, b)"]);
    assert_eq!(matches(&[("x", "f($*_)")], "f()"), vec!["f()"]);
}

#[test]
fn repeated_variadic_requires_equal_runs() {
    assert_eq!(
        matches(&[("x", "f($*a, x, $*a)")], "f(a, b, x, a, b)"),
        vec!["f(a, b, x, a, b)"]
    );
    assert!(matches(&[("x", "f($*a, x, $*a)")], "f(a, x, b)").is_empty());
}

#[test]
fn variadic_rebinding_across_list_species_fails() {
    // Same name captured once from an expression list and once from a
    // statement list: different species never compare equal.
    assert_eq!(matches(&[("x", "f($*a); g($*a)")], "f(x); g(x)").len(), 1);
    assert!(matches(&[("x", "f($*a); { $*a }")], "f(x); { x }").is_empty());
}

#[test]
fn if_header_matches_as_synthetic_list() {
    let src = "if x := f(); x > 0 { g() }";
    assert_eq!(matches(&[("x", "if $*_ { $*_ }")], src), vec![src]);

    let mut m = Matcher::new();
    let pipe = m.compile(&[("x", "if $*c { $*_ }")]).unwrap();
    let root = m.parse_pattern(src).unwrap();
    let ms = m.run(&pipe, root).unwrap();
    assert_eq!(ms.len(), 1);
    let c = m.sym("c");
    let bound = ms[0].values.get(&c).copied().expect("header bound");
    assert_eq!(bound.list_len(), 2, "init and cond");
}

#[test]
fn for_and_switch_headers_short_circuit() {
    let src = "for i := 0; i < 10; i++ { f(i) }";
    assert_eq!(matches(&[("x", "for $*_ { $*_ }")], src), vec![src]);

    let src = "switch x := f(); x { case 1: g() }";
    assert_eq!(matches(&[("x", "switch $*_ { case $*_: }")], src), vec![src]);
}

#[test]
fn bare_variadic_matches_sibling_runs() {
    // A lone `$*a` also tries its wrapped list forms against list roots.
    assert_eq!(matches(&[("x", "$*a")], "a, b"), vec!["a, b"]);
    assert_eq!(matches(&[("x", "$*a")], "a; b"), vec!["a; b"]);
}

#[test]
fn partial_statement_window() {
    assert_eq!(
        matches(&[("x", "a(); b()")], "z(); a(); b(); c()"),
        vec!["a(); b()"]
    );
}

#[test]
fn filters_keep_and_drop_containers() {
    let src = "package p\n\nfunc a() { fmt.Println(1) }\n\nfunc b() { fmt.Scan() }\n";
    let mut m = Matcher::new();
    let f = m.parse_file(src).unwrap();

    let keep = m
        .compile(&[("x", "func $_() { $*_ }"), ("g", "fmt.Println($_)")])
        .unwrap();
    let kept = m.run(&keep, NodeRef::File(f)).unwrap();
    assert_eq!(kept.len(), 1);
    assert!(m.span_text(src, kept[0].node).contains("func a"));

    let drop = m
        .compile(&[("x", "func $_() { $*_ }"), ("v", "fmt.Println($_)")])
        .unwrap();
    let dropped = m.run(&drop, NodeRef::File(f)).unwrap();
    assert_eq!(dropped.len(), 1);
    assert!(m.span_text(src, dropped[0].node).contains("func b"));
}

#[test]
fn call_spread_must_agree() {
    assert!(matches(&[("x", "f($_)")], "f(x...)").is_empty());
    assert_eq!(matches(&[("x", "f($_...)")], "f(x...)"), vec!["f(x...)"]);
}

#[test]
fn case_list_sugar() {
    let got = matches(
        &[("x", "switch $_ { case $*a: case $*b: }")],
        "switch v { case 1: f(); case 2: g() }",
    );
    assert_eq!(got.len(), 1);
}

#[test]
fn name_regex_constraint() {
    assert_eq!(matches(&[("x", "$x(rx=/^New/)")], "NewReader(f)"), vec!["NewReader"]);
    assert!(matches(&[("x", "$x(rx=/^Old/)")], "NewReader(f)").is_empty());
}

#[test]
fn assignment_matches_value_spec_only_leniently() {
    let strict = matches(&[("x", "$a = $b")], "var x = f()");
    assert!(strict.is_empty());

    let lax = matches_with(Lenience::aggressive(), &[("x", "$a = $b")], "var x = f()");
    assert_eq!(lax, vec!["x = f()"]);
}

#[test]
fn absent_else_branch_matches_only_leniently() {
    let src = "if a { b() } else { c() }";
    assert!(matches(&[("x", "if $_ { $*_ }")], src).is_empty());

    let lenience = Lenience {
        nil_matches_any: true,
        ..Lenience::default()
    };
    assert_eq!(matches_with(lenience, &[("x", "if $_ { $*_ }")], src).len(), 1);
}

#[test]
fn block_pattern_matches_bare_list_only_leniently() {
    assert!(matches(&[("x", "{ $*_ }")], "a(); b()").is_empty());

    let lenience = Lenience {
        block_as_list: true,
        ..Lenience::default()
    };
    assert_eq!(
        matches_with(lenience, &[("x", "{ $*_ }")], "a(); b()"),
        vec!["a(); b()"]
    );
}

#[test]
fn one_name_spec_elision() {
    assert!(matches(&[("x", "var x = 1")], "var x, y = 1, 2").is_empty());

    let lenience = Lenience {
        spec_elision: true,
        ..Lenience::default()
    };
    assert_eq!(
        matches_with(lenience, &[("x", "var x = 1")], "var x, y = 1, 2").len(),
        1
    );
}

#[test]
fn empty_pipeline_is_identity() {
    let mut m = Matcher::new();
    let pipe = m.compile(&[]).unwrap();
    let root = m.parse_pattern("f(x)").unwrap();
    let ms = m.run(&pipe, root).unwrap();
    assert_eq!(ms.len(), 1);
    assert_eq!(ms[0].node, root);
}

#[test]
fn bad_inputs_are_reported() {
    let mut m = Matcher::new();
    assert!(m.compile(&[("q", "$x")]).is_err());
    assert!(m.compile(&[("x", "if {")]).is_err());
    assert!(m.parse_pattern("").is_err());
}
