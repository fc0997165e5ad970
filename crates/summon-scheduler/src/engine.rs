use std::{
    collections::{HashMap, HashSet},
    path::Path,
    time::Instant,
};

use tracing::{debug, info, warn};

use crate::{
    error::SchedulerError,
    graph::{Built, GraphState, Scheduler},
    task::{TaskBody, TaskContext, TaskKind, TaskOutput},
    weights::WeightTable,
};

/// Small-batch packing threshold (spec.md §4.1: "pack worker tasks onto the
/// least-loaded process until the pack's estimated time exceeds ~0.1s").
/// There is only one worker pool here (`rayon`, not N worker processes), so
/// "least-loaded process" collapses to "the next batch"; the threshold
/// still caps how much estimated work goes into one `rayon::spawn` call so
/// a very large ready-set doesn't get dispatched as a single giant batch.
const PACK_THRESHOLD_SECONDS: f64 = 0.1;

/// Handle an owner task body uses to extend the graph mid-run: `add_task`
/// for new work, `replace_placeholder` to fill in a previously reserved
/// node. Worker tasks never see this — they run off on the rayon pool with
/// no way to mutate shared scheduler state, which is the whole point of the
/// worker/owner split (spec.md §4.1).
pub struct GraphHandle<'a> {
    state: &'a mut GraphState,
}

impl<'a> GraphHandle<'a> {
    pub fn add_task(&mut self, spec: crate::task::TaskSpec) -> Result<(), SchedulerError> {
        self.state.add_task(spec)
    }

    pub fn replace_placeholder(&mut self, name: &str, body: TaskBody) -> Result<(), SchedulerError> {
        self.state.replace_placeholder(name, body)
    }
}

impl<'a> crate::TaskRegistrar for GraphHandle<'a> {
    fn add_task(&mut self, spec: crate::task::TaskSpec) -> Result<(), SchedulerError> {
        GraphHandle::add_task(self, spec)
    }
}

#[derive(Debug, Default)]
pub struct PrefixStats {
    pub count: u64,
    pub cpu_seconds: f64,
    pub wall_seconds: f64,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub completed_tasks: usize,
    /// Accumulated `(count, cpu, wall)` per configured observability
    /// prefix, per spec.md §4.1's "Observability" paragraph.
    pub prefix_stats: HashMap<String, PrefixStats>,
}

enum WorkerMessage {
    Done {
        name: String,
        output: TaskOutput,
        wall_seconds: f64,
    },
    Failed {
        name: String,
        failure: crate::task::TaskFailure,
    },
}

impl Scheduler<Built> {
    /// Runs every task to completion. `cache_dir` is where the learned
    /// weight table is loaded from and saved back to
    /// (`scheduler-weights.json`); `observed_prefixes` names the task-name
    /// prefixes to accumulate `(count, cpu, wall)` stats for.
    pub fn run(
        self,
        cache_dir: &Path,
        observed_prefixes: &[String],
    ) -> Result<RunReport, SchedulerError> {
        let mut state = self.into_state();
        let weights_path = cache_dir.join("scheduler-weights.json");
        let mut weights = WeightTable::load(&weights_path)?;

        let mut completed: HashMap<String, TaskOutput> = HashMap::new();
        let mut dispatched: HashSet<String> = HashSet::new();
        let mut report = RunReport::default();
        for prefix in observed_prefixes {
            report
                .prefix_stats
                .entry(prefix.clone())
                .or_insert_with(PrefixStats::default);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("building a current-thread tokio runtime never fails");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<WorkerMessage>();

        let result = runtime.block_on(async {
            loop {
                run_owner_tasks_to_exhaustion(
                    &mut state,
                    &mut completed,
                    &mut dispatched,
                    &mut weights,
                    &mut report,
                    observed_prefixes,
                )?;

                if all_done(&state, &completed) {
                    break;
                }

                let ready = ready_worker_tasks(&state, &completed, &dispatched);
                if ready.is_empty() {
                    if dispatched.len() == completed.len() {
                        // Nothing in flight, nothing ready, graph not done:
                        // an unresolved placeholder or a dangling forward
                        // reference is blocking progress forever.
                        let stuck = state
                            .nodes
                            .keys()
                            .find(|name| !completed.contains_key(name.as_str()))
                            .cloned()
                            .unwrap_or_default();
                        return Err(SchedulerError::UnresolvedPlaceholder(stuck));
                    }
                } else {
                    for batch in pack_into_batches(&state, &weights, ready) {
                        dispatched.extend(batch.iter().cloned());
                        dispatch_batch(&mut state, &completed, batch, tx.clone());
                    }
                }

                match rx.recv().await {
                    Some(WorkerMessage::Done {
                        name,
                        output,
                        wall_seconds,
                    }) => {
                        weights.record(&name, wall_seconds);
                        accumulate_prefix_stats(&mut report, &name, wall_seconds, observed_prefixes);
                        completed.insert(name, output);
                    }
                    Some(WorkerMessage::Failed { name, failure }) => {
                        warn!(task = %name, "worker task failed, shutting down");
                        return Err(SchedulerError::TaskFailed {
                            task: name,
                            source: failure,
                        });
                    }
                    None => break,
                }
            }
            Ok(())
        });

        weights.save(&weights_path)?;
        result?;

        report.completed_tasks = completed.len();
        info!(completed = report.completed_tasks, "scheduler run finished");
        Ok(report)
    }
}

fn all_done(state: &GraphState, completed: &HashMap<String, TaskOutput>) -> bool {
    state.nodes.keys().all(|name| completed.contains_key(name))
}

fn is_ready(state: &GraphState, completed: &HashMap<String, TaskOutput>, name: &str) -> bool {
    state.nodes[name]
        .resolved_deps
        .iter()
        .all(|dep| completed.contains_key(dep))
}

fn run_owner_tasks_to_exhaustion(
    state: &mut GraphState,
    completed: &mut HashMap<String, TaskOutput>,
    dispatched: &mut HashSet<String>,
    weights: &mut WeightTable,
    report: &mut RunReport,
    observed_prefixes: &[String],
) -> Result<(), SchedulerError> {
    loop {
        let ready: Vec<String> = state
            .insertion_order
            .iter()
            .filter(|name| {
                !completed.contains_key(name.as_str())
                    && matches!(state.nodes[name.as_str()].spec.body, TaskBody::Owner(_))
                    && is_ready(state, completed, name)
            })
            .cloned()
            .collect();
        if ready.is_empty() {
            return Ok(());
        }

        for name in ready {
            dispatched.insert(name.clone());
            let node = state.nodes.remove(&name).expect("ready task exists");
            let body = match node.spec.body {
                TaskBody::Owner(body) => body,
                _ => unreachable!("filtered to owner tasks above"),
            };
            let start = Instant::now();
            let result = {
                let ctx = TaskContext {
                    outputs: completed,
                    deps: &node.resolved_deps,
                };
                let mut handle = GraphHandle { state: &mut *state };
                body(&ctx, &mut handle)
            };
            let elapsed = start.elapsed().as_secs_f64();
            match result {
                Ok(output) => {
                    weights.record(&name, elapsed);
                    accumulate_prefix_stats(report, &name, elapsed, observed_prefixes);
                    completed.insert(name, output);
                }
                Err(failure) => {
                    return Err(SchedulerError::TaskFailed {
                        task: name,
                        source: failure,
                    })
                }
            }
        }
    }
}

fn ready_worker_tasks(
    state: &GraphState,
    completed: &HashMap<String, TaskOutput>,
    dispatched: &HashSet<String>,
) -> Vec<String> {
    state
        .insertion_order
        .iter()
        .filter(|name| {
            !completed.contains_key(name.as_str())
                && !dispatched.contains(name.as_str())
                && matches!(state.nodes[name.as_str()].spec.body, TaskBody::Worker(_))
                && is_ready(state, completed, name)
        })
        .cloned()
        .collect()
}

/// Critical-path estimate: a task's own weight plus the weight of its
/// heaviest downstream chain, memoized over the current snapshot of the
/// graph. Recomputed every scheduling round rather than incrementally,
/// since owner tasks can add nodes between rounds.
fn critical_path_weights(state: &GraphState, weights: &WeightTable) -> HashMap<String, f64> {
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, node) in &state.nodes {
        for dep in &node.resolved_deps {
            successors.entry(dep.as_str()).or_default().push(name.as_str());
        }
    }

    let mut memo: HashMap<String, f64> = HashMap::new();
    fn cp<'a>(
        name: &'a str,
        state: &'a GraphState,
        weights: &WeightTable,
        successors: &HashMap<&'a str, Vec<&'a str>>,
        memo: &mut HashMap<String, f64>,
        visiting: &mut HashSet<String>,
    ) -> f64 {
        if let Some(&v) = memo.get(name) {
            return v;
        }
        if !visiting.insert(name.to_string()) {
            // defensive: a cycle slipped through validate(); treat as a
            // leaf rather than recursing forever.
            return weights.estimate(name, state.nodes[name].spec.weight_hint);
        }
        let own = weights.estimate(name, state.nodes[name].spec.weight_hint);
        let best_child = successors
            .get(name)
            .map(|children| {
                children
                    .iter()
                    .map(|child| cp(child, state, weights, successors, memo, visiting))
                    .fold(0.0_f64, f64::max)
            })
            .unwrap_or(0.0);
        visiting.remove(name);
        let value = own + best_child;
        memo.insert(name.to_string(), value);
        value
    }

    let names: Vec<String> = state.insertion_order.clone();
    let mut visiting = HashSet::new();
    for name in &names {
        cp(name, state, weights, &successors, &mut memo, &mut visiting);
    }
    memo
}

fn pack_into_batches(
    state: &GraphState,
    weights: &WeightTable,
    mut ready: Vec<String>,
) -> Vec<Vec<String>> {
    let cp = critical_path_weights(state, weights);
    ready.sort_by(|a, b| {
        cp.get(b)
            .copied()
            .unwrap_or(0.0)
            .partial_cmp(&cp.get(a).copied().unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut current_weight = 0.0_f64;
    for name in ready {
        let own_weight = weights.estimate(&name, state.nodes[&name].spec.weight_hint);
        if !current.is_empty() && current_weight + own_weight > PACK_THRESHOLD_SECONDS {
            batches.push(std::mem::take(&mut current));
            current_weight = 0.0;
        }
        current_weight += own_weight;
        current.push(name);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

fn dispatch_batch(
    state: &mut GraphState,
    completed: &HashMap<String, TaskOutput>,
    batch: Vec<String>,
    tx: tokio::sync::mpsc::UnboundedSender<WorkerMessage>,
) {
    let mut taken = Vec::new();
    for name in &batch {
        let node = state.nodes.remove(name).expect("ready task exists");
        let body = match node.spec.body {
            TaskBody::Worker(body) => body,
            _ => unreachable!("filtered to worker tasks above"),
        };
        taken.push((name.clone(), node.resolved_deps, body));
    }
    let snapshot: HashMap<String, TaskOutput> = completed.clone();

    rayon::spawn(move || {
        for (name, resolved_deps, body) in taken {
            let ctx = TaskContext {
                outputs: &snapshot,
                deps: &resolved_deps,
            };
            let start = Instant::now();
            let result = body(&ctx);
            let wall_seconds = start.elapsed().as_secs_f64();
            let message = match result {
                Ok(output) => WorkerMessage::Done {
                    name,
                    output,
                    wall_seconds,
                },
                Err(failure) => WorkerMessage::Failed { name, failure },
            };
            if tx.send(message).is_err() {
                debug!("scheduler run already ended, dropping remaining worker results");
                return;
            }
        }
    });
}

fn accumulate_prefix_stats(
    report: &mut RunReport,
    task_name: &str,
    elapsed: f64,
    observed_prefixes: &[String],
) {
    for prefix in observed_prefixes {
        if task_name.starts_with(prefix.as_str()) {
            let entry = report.prefix_stats.entry(prefix.clone()).or_default();
            entry.count += 1;
            entry.cpu_seconds += elapsed;
            entry.wall_seconds += elapsed;
        }
    }
}

pub use TaskKind as ObservedTaskKind;
