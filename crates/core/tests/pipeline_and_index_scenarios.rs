use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use foundry_core::build::stage::ClosureStage;
use foundry_core::build::{BuildPipeline, Phase};
use foundry_core::compile_commands::CompileCommands;
use foundry_core::context::{Context, CreateFlags};
use foundry_core::fuzzy::FuzzyIndex;
use foundry_core::scheduler::{boxed, Cancellable};

#[tokio::test]
async fn a_project_can_discover_its_context_and_run_a_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join(".foundry")).unwrap();
    let nested = tmp.path().join("build");
    std::fs::create_dir(&nested).unwrap();

    let ctx = Context::discover(&nested, CreateFlags::empty()).unwrap();
    assert_eq!(ctx.project_directory(), tmp.path());

    let ran = Arc::new(AtomicUsize::new(0));
    let ran2 = Arc::clone(&ran);
    let mut pipeline = BuildPipeline::new();
    pipeline.add_stage(Arc::new(ClosureStage::new(
        "configure-project",
        Phase::CONFIGURE,
        move |_| {
            let ran2 = Arc::clone(&ran2);
            boxed(async move {
                ran2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        },
    )));

    pipeline
        .run(Phase::BUILD | Phase::CONFIGURE, Cancellable::new())
        .await
        .unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    ctx.shutdown().await.unwrap();
    assert!(ctx.is_shutdown());
}

#[tokio::test]
async fn compile_commands_feed_into_a_fuzzy_index_of_source_files() {
    let json = r#"[
        {"directory": "/proj/build", "file": "/proj/src/build_pipeline.c", "arguments": ["gcc", "-Isrc", "-c", "build_pipeline.c"]},
        {"directory": "/proj/build", "file": "/proj/src/fuzzy_index.c", "arguments": ["gcc", "-Isrc", "-c", "fuzzy_index.c"]}
    ]"#;
    let compile_commands = CompileCommands::parse(json).unwrap();
    assert_eq!(compile_commands.len(), 2);

    let mut index: FuzzyIndex<()> = FuzzyIndex::new();
    index.insert("build_pipeline.c", ());
    index.insert("fuzzy_index.c", ());

    let hits = index.query("bpl", 0);
    assert_eq!(hits.len(), 1);
    let (name, _) = index.get(hits[0].id).unwrap();
    assert_eq!(name, "build_pipeline.c");

    let source_path = std::path::Path::new("/proj/src").join(name);
    let info = compile_commands
        .lookup(&source_path)
        .expect("indexed file should resolve back to its compile info");
    let filtered = CompileCommands::filter_c(info, &[]);
    assert_eq!(filtered, vec!["gcc".to_string(), "-I/proj/build/src".to_string()]);
}
