use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diybot::ui::markdown::{render_markdown, Cursor, RenderOptions};
use diybot::ui::theme::Theme;
use std::hint::black_box;

const SECTION: &str = "## Setup\n\nInstall the tool and run `diybot say hello` to check the \
connection. Long paragraphs wrap at the terminal width, so this one keeps going for a while \
to give the wrapper some work.\n\n- first item\n- second item with **bold** text\n  - nested item\n\n\
| flag | meaning |\n|---|---|\n| --model | model name |\n| --log | log file |\n\n\
```rust\nfn main() {\n    println!(\"hello\");\n}\n```\n\n";

fn reply(sections: usize) -> String {
    SECTION.repeat(sections)
}

/// Every char-boundary prefix that ends a word, as a stream would deliver it.
fn prefixes(text: &str) -> Vec<&str> {
    text.char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| &text[..i])
        .collect()
}

fn bench_render_stream(c: &mut Criterion) {
    let theme = Theme::dark_default();
    let glyph = "▋";

    for &sections in &[1usize, 8] {
        let text = reply(sections);
        let steps = prefixes(&text);

        let mut group = c.benchmark_group(format!("render_stream_sections{sections}"));
        group.throughput(Throughput::Elements(steps.len() as u64));

        for &highlight in &[false, true] {
            let mut opts = RenderOptions::new(&theme);
            opts.syntax_highlighting = highlight;
            opts.width = 80;
            opts.cursor = Some(Cursor {
                glyph,
                visible: true,
            });
            group.bench_with_input(
                BenchmarkId::new("every_prefix", if highlight { "syntax" } else { "plain" }),
                &steps,
                |b, steps| {
                    b.iter(|| {
                        for prefix in steps.iter() {
                            black_box(render_markdown(prefix, &opts));
                        }
                    })
                },
            );
        }

        let mut opts = RenderOptions::new(&theme);
        opts.width = 80;
        group.bench_function("final_only", |b| {
            b.iter(|| black_box(render_markdown(&text, &opts)))
        });
        group.finish();
    }
}

criterion_group!(benches, bench_render_stream);
criterion_main!(benches);
