//! Evaluating one target against many agents at once.

use super::error::MatchError;
use super::expression::TargetExpression;
use super::nodegroup::NodegroupTable;
use crate::context::MatchContext;
use crate::engine::EngineRegistry;
use crossbeam::channel;
use std::panic;
use tracing::debug;

/// Evaluates `expression` for every context in `contexts`, using up to `workers` threads.
///
/// Returns each context's identity with its verdict, in the same order as `contexts`. One
/// context's failure doesn't affect the others.
///
/// A `workers` value of zero is treated as one.
pub fn match_fleet(
    expression: impl Into<TargetExpression>,
    contexts: &[MatchContext],
    engines: &EngineRegistry,
    nodegroups: &NodegroupTable,
    workers: usize,
) -> Vec<(String, Result<bool, MatchError>)> {
    let expression = expression.into();
    let workers = workers.clamp(1, contexts.len().max(1));
    debug!(
        "matching {expression} against {} agents with {workers} workers",
        contexts.len(),
    );

    let (job_outbox, jobs) = channel::unbounded();
    for job in contexts.iter().enumerate() {
        // The receiver is still in scope, so this can't fail.
        let _ = job_outbox.send(job);
    }
    drop(job_outbox);

    let (result_outbox, results) = channel::unbounded();
    let scope = crossbeam::thread::scope(|s| {
        for _ in 0..workers {
            let jobs = jobs.clone();
            let result_outbox = result_outbox.clone();
            let expression = &expression;
            s.spawn(move |_| {
                for (index, ctx) in jobs.iter() {
                    let verdict = super::evaluate(expression, ctx, engines, nodegroups);
                    let _ = result_outbox.send((index, verdict));
                }
            });
        }
    });
    if let Err(payload) = scope {
        panic::resume_unwind(payload);
    }
    drop(result_outbox);

    let mut verdicts: Vec<Option<Result<bool, MatchError>>> =
        contexts.iter().map(|_| None).collect();
    for (index, verdict) in results.iter() {
        verdicts[index] = Some(verdict);
    }

    contexts
        .iter()
        .zip(verdicts)
        .filter_map(|(ctx, verdict)| Some((ctx.id.clone(), verdict?)))
        .collect()
}
