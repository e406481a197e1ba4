//! Benchmarks for pipeline execution.

use achflow::context::ContextSnapshot;
use achflow::pipeline::Pipeline;
use achflow::stages::{PromptTemplate, Stage};
use achflow::testing::RecordingStage;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::sync::Arc;

fn chain(len: usize) -> Pipeline {
    let stages = (0..len).map(|i| {
        let stage = RecordingStage::new(format!("stage_{i}"), format!("key_{i}"));
        let stage = if i == 0 {
            stage.with_inputs(["seed"])
        } else {
            stage.with_inputs([format!("key_{}", i - 1)])
        };
        Arc::new(stage) as Arc<dyn Stage>
    });
    Pipeline::builder("bench")
        .seed_key("seed")
        .stages(stages)
        .build()
        .unwrap()
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let pipeline = chain(8);
    let seed = ContextSnapshot::from_entries([("seed".to_string(), json!("request"))]);

    c.bench_function("run_8_stages", |b| {
        b.iter(|| {
            let run = runtime
                .block_on(pipeline.run(black_box(seed.clone())))
                .unwrap();
            black_box(run)
        });
    });
}

fn template_benchmark(c: &mut Criterion) {
    let template = PromptTemplate::new(
        "<hypotheses>\n{hypotheses}\n</hypotheses>\n<evidence>\n{evidence}\n</evidence>",
    );
    let context = ContextSnapshot::from_entries([
        (
            "hypotheses".to_string(),
            json!({ "hypotheses": ["X will occur", "X will not occur"], "reasoning": "r" }),
        ),
        ("evidence".to_string(), json!("Officials say X is on schedule. ".repeat(200))),
    ]);

    c.bench_function("render_template", |b| {
        b.iter(|| black_box(template.render("bench", black_box(&context)).unwrap()));
    });
}

criterion_group!(benches, pipeline_benchmark, template_benchmark);
criterion_main!(benches);
