use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gogrep::lexer::Lexer;
use gogrep::Matcher;
use std::hint::black_box as bb;

// =============================================================================
// Corpus
// =============================================================================

const SMALL_EXPR: &str = "f(a, g(b+c, d), h())";

const MEDIUM_STMTS: &str = r#"
x := compute(a, b)
if x > threshold {
    log.Printf("over: %v", x)
    return x
}
for i := 0; i < len(items); i++ {
    total += items[i].Weight
}
switch kind {
case "a", "b":
    handle(kind)
default:
    reject(kind)
}
"#;

const LARGE_FILE: &str = r#"
package pipeline

import "fmt"

type stage struct {
    name string
    next chan int
}

func run(stages []stage, input chan int) {
    for i := range input {
        fmt.Println(i)
        for _, s := range stages {
            select {
            case s.next <- i:
                continue
            default:
                drop(s.name, i)
            }
        }
    }
}

func drop(name string, v int) {
    fmt.Printf("%s dropped %d\n", name, v)
}
"#;

// =============================================================================
// Benchmark 1: Lexing
// =============================================================================

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    for (name, input) in [
        ("small", SMALL_EXPR),
        ("medium", MEDIUM_STMTS),
        ("large", LARGE_FILE),
    ] {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("iterate", name), &input, |b, &input| {
            b.iter(|| {
                let mut acc = 0u64;
                for (l, _t, r) in Lexer::new(bb(input)) {
                    acc = acc.wrapping_add(l as u64).wrapping_add(r as u64);
                }
                bb(acc);
            });
        });
    }
    group.finish();
}

// =============================================================================
// Benchmark 2: Pattern matching
// =============================================================================

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");
    let cases: &[(&str, &str, &str)] = &[
        ("wildcard_everything", "$_", MEDIUM_STMTS),
        ("bound_repeat", "$x + $x", MEDIUM_STMTS),
        ("call_args_variadic", "f($*_, d, $*_)", SMALL_EXPR),
        ("header_list", "if $*_ { $*_ }", MEDIUM_STMTS),
    ];
    for &(name, pat, src) in cases {
        group.bench_function(BenchmarkId::new("run", name), |b| {
            b.iter(|| {
                let mut m = Matcher::new();
                let pipe = m.compile(&[("x", pat)]).unwrap();
                let root = m.parse_pattern(src).unwrap();
                bb(m.run(&pipe, root).unwrap().len());
            });
        });
    }

    group.bench_function("run_over_file", |b| {
        b.iter(|| {
            let mut m = Matcher::new();
            let pipe = m.compile(&[("x", "fmt.Println($_)")]).unwrap();
            let f = m.parse_file(LARGE_FILE).unwrap();
            bb(m
                .run(&pipe, gogrep::NodeRef::File(f))
                .unwrap()
                .len());
        });
    });
    group.finish();
}

// =============================================================================
// Benchmark 3: Substitution
// =============================================================================

fn bench_substitution(c: &mut Criterion) {
    let mut group = c.benchmark_group("substitution");
    group.bench_function("rewrite_calls", |b| {
        b.iter(|| {
            let mut m = Matcher::new();
            let pipe = m
                .compile(&[("x", "fmt.Println($x)"), ("s", "log.Print($x)")])
                .unwrap();
            let f = m.parse_file(LARGE_FILE).unwrap();
            bb(m
                .run(&pipe, gogrep::NodeRef::File(f))
                .unwrap()
                .len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_lexer, bench_matching, bench_substitution);
criterion_main!(benches);
