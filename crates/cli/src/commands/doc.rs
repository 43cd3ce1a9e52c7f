//! `foundry doc`: a seam over concrete documentation bundle providers.
//! Queries run against a `FuzzyIndex` built from whatever bundles are
//! registered; with none bundled by default, both subcommands report an
//! empty result set rather than erroring, matching "no results" UX for an
//! unconfigured provider.

use anyhow::Result;
use foundry_core::fuzzy::FuzzyIndex;
use serde::Serialize;

use crate::cli::DocCommands;
use crate::output::{self, Format};

#[derive(Serialize)]
struct DocHit {
    title: String,
    score: f32,
}

pub async fn run(format: Format, command: DocCommands) -> Result<()> {
    match command {
        DocCommands::Query { search_text } => {
            let query = search_text.join(" ");
            let index: FuzzyIndex<()> = FuzzyIndex::new();
            let hits: Vec<DocHit> = index
                .query(&query, 0)
                .into_iter()
                .filter_map(|m| index.get(m.id).map(|(text, _)| DocHit {
                    title: text.to_string(),
                    score: m.score,
                }))
                .collect();
            output::emit(format, &hits, |hits| {
                if hits.is_empty() {
                    println!("no documentation bundles registered.");
                }
                for hit in hits {
                    println!("{}\t{:.3}", hit.title, hit.score);
                }
            })
        }
        DocCommands::BundleList => {
            let bundles: Vec<String> = Vec::new();
            output::emit(format, &bundles, |bundles| {
                if bundles.is_empty() {
                    println!("no documentation bundles registered.");
                }
            })
        }
    }
}
