use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_task_run(task: &str, status: &str, duration: Duration) {
    counter!(
        "iam_task_runs_total",
        "task" => task.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "iam_task_duration_seconds",
        "task" => task.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_task_cadence(task: &str, cadence: Duration) {
    histogram!(
        "iam_task_cadence_seconds",
        "task" => task.to_string()
    )
    .record(cadence.as_secs_f64());
}
