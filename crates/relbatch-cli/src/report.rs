use std::fmt::Write;

use relbatch_client::BatchResult;
use relbatch_core::{Chunk, OperationSet};

/// Human-readable dedup and chunking summary for `relbatch plan`.
pub fn plan_summary(set: &OperationSet, chunks: &[Chunk], transactional: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "input operations:   {}", set.input_count());
    let _ = writeln!(out, "duplicates removed: {}", set.duplicates_removed());
    let _ = writeln!(out, "writes overridden:  {}", set.overridden_writes());
    let _ = writeln!(
        out,
        "operations to send: {} ({} writes, {} deletes)",
        set.len(),
        set.write_count(),
        set.delete_count()
    );
    if transactional {
        let _ = writeln!(out, "mode:               transactional (1 request)");
    } else {
        let _ = writeln!(out, "mode:               chunked ({} requests)", chunks.len());
        for chunk in chunks {
            let _ = writeln!(
                out,
                "  chunk {:>4}: {} writes, {} deletes",
                chunk.index,
                chunk.writes().count(),
                chunk.deletes().count()
            );
        }
    }
    out
}

/// Summary printed after `relbatch write`.
pub fn result_summary(result: &BatchResult) -> String {
    let mut out = String::new();
    let status = if result.total_chunks() == 0 {
        "nothing to write"
    } else if result.is_complete_success() {
        "success"
    } else if result.is_partial_success() {
        "partial success"
    } else {
        "failed"
    };
    let _ = writeln!(out, "status:     {status}");
    let _ = writeln!(out, "operations: {}", result.total_operations());
    let _ = writeln!(
        out,
        "chunks:     {} succeeded, {} failed, {} total ({:.1}%)",
        result.succeeded_chunks(),
        result.failed_chunks(),
        result.total_chunks(),
        result.success_rate() * 100.0
    );

    let mut failures: Vec<_> = result
        .outcomes()
        .iter()
        .filter(|o| !o.succeeded && !o.is_cancelled())
        .collect();
    failures.sort_by_key(|o| o.chunk_index);
    for outcome in failures {
        if let Some(ref error) = outcome.error {
            let _ = writeln!(
                out,
                "  chunk {} failed after {} attempt(s): {error}",
                outcome.chunk_index, outcome.attempts
            );
        }
    }

    let cancelled = result.outcomes().iter().filter(|o| o.is_cancelled()).count();
    if cancelled > 0 {
        let _ = writeln!(out, "  {cancelled} chunk(s) cancelled after the first failure");
    }
    out
}
