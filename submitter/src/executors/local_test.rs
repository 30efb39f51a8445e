use super::{local::LocalExecutor, Executor, ExecutorError, Submission};
use crate::{
    config::SubmitterConfig,
    dispatch::Dispatcher,
    job::Batch,
    test_util::submitter_config,
};
use std::{fs, path::Path, time::Duration};

fn executor(config: SubmitterConfig) -> LocalExecutor {
    let dry = config.dry;

    LocalExecutor::load(config, Dispatcher::new(dry)).with_poll_interval(Duration::from_millis(50))
}

fn local_config(job_dir: &Path, max_jobs: Option<usize>) -> SubmitterConfig {
    SubmitterConfig {
        max_jobs,
        // no profile to source on a test machine
        env_script: String::new(),
        ..submitter_config(job_dir)
    }
}

/// command that records its start and end in `log`
fn traced(label: &str, log: &Path, seconds: &str) -> String {
    format!(
        "echo start-{label} >> {0}; sleep {seconds}; echo end-{label} >> {0}",
        log.display()
    )
}

/// highest number of jobs between a start and an end line
fn max_overlap(log: &str) -> usize {
    let mut running = 0usize;
    let mut max = 0;
    for line in log.lines() {
        if line.starts_with("start-") {
            running += 1;
            max = max.max(running);
        } else if line.starts_with("end-") {
            running -= 1;
        }
    }
    max
}

#[test]
pub fn one_slot_runs_jobs_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let log = dir.path().join("trace.log");
    let batch = Batch::new(
        [traced("job1", &log, "0.3"), traced("job2", &log, "0")],
        ["job1", "job2"],
        &job_dir,
    )
    .unwrap();

    let submission = executor(local_config(&job_dir, Some(1)))
        .execute(&batch)
        .unwrap();

    assert_eq!(
        submission,
        Submission::Local {
            jobs: 2,
            peak_running: 1
        }
    );
    assert!(job_dir.join("threads_job1.sh").is_file());
    assert!(job_dir.join("threads_job2.sh").is_file());
    // job2 only starts once job1 is gone, and both are done on return
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "start-job1\nend-job1\nstart-job2\nend-job2\n"
    );
}

#[test]
pub fn never_exceeds_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let log = dir.path().join("trace.log");
    let labels = ["a", "b", "c", "d", "e"];
    let commands = labels.map(|label| traced(label, &log, "0.2"));
    let batch = Batch::new(commands, labels, &job_dir).unwrap();

    let submission = executor(local_config(&job_dir, Some(2)))
        .execute(&batch)
        .unwrap();

    match submission {
        Submission::Local { jobs, peak_running } => {
            assert_eq!(jobs, 5);
            assert!(peak_running <= 2);
        }
        other => panic!("expected a local submission, got {other:?}"),
    }
    let trace = fs::read_to_string(&log).unwrap();
    assert_eq!(trace.lines().count(), 10);
    assert!(max_overlap(&trace) <= 2);
}

#[test]
pub fn unbounded_runs_everything_at_once() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let batch = Batch::new(["sleep 0.5", "sleep 0.5", "sleep 0.5"], ["x", "y", "z"], &job_dir)
        .unwrap();

    let submission = executor(local_config(&job_dir, None))
        .execute(&batch)
        .unwrap();

    assert_eq!(
        submission,
        Submission::Local {
            jobs: 3,
            peak_running: 3
        }
    );
}

#[test]
pub fn captures_output_per_label() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let batch = Batch::new(["echo hello; echo oops >&2"], ["greet"], &job_dir).unwrap();

    executor(local_config(&job_dir, None))
        .execute(&batch)
        .unwrap();

    let stdout = fs::read_to_string(job_dir.join("threads_greet.out")).unwrap();
    assert!(stdout.contains("Begin: "));
    assert!(stdout.contains("hello"));
    assert!(stdout.contains("End: "));
    assert!(fs::read_to_string(job_dir.join("threads_greet.err"))
        .unwrap()
        .contains("oops"));
}

#[test]
pub fn failures_do_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let marker = dir.path().join("second-ran");
    let batch = Batch::new(
        [String::from("exit 5"), format!("touch {}", marker.display())],
        ["fails", "succeeds"],
        &job_dir,
    )
    .unwrap();

    executor(local_config(&job_dir, Some(1)))
        .execute(&batch)
        .unwrap();

    assert!(marker.exists());
}

#[test]
pub fn dry_run_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let marker = dir.path().join("ran");
    let batch = Batch::new([format!("touch {}", marker.display())], ["t"], &job_dir).unwrap();
    let config = SubmitterConfig {
        dry: true,
        ..local_config(&job_dir, Some(1))
    };

    let submission = executor(config).execute(&batch).unwrap();

    assert_eq!(
        submission,
        Submission::Local {
            jobs: 1,
            peak_running: 0
        }
    );
    assert!(job_dir.join("threads_t.sh").is_file());
    assert!(!job_dir.join("threads_t.out").exists());
    assert!(!marker.exists());
}

#[test]
pub fn job_dir_taken_by_file() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    fs::write(&job_dir, "not a directory").unwrap();
    let batch = Batch::new(["true"], ["t"], &job_dir).unwrap();

    let result = executor(local_config(&job_dir, None)).execute(&batch);

    assert!(matches!(result, Err(ExecutorError::JobDir(path, _)) if path == job_dir));
}

#[test]
pub fn unwritable_wrapper_stops_before_any_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let marker = dir.path().join("marker");
    let batch = Batch::new(
        [format!("touch {}", marker.display()), String::from("true")],
        ["first", "missing/second"],
        &job_dir,
    )
    .unwrap();

    let result = executor(local_config(&job_dir, None)).execute(&batch);

    assert!(matches!(result, Err(ExecutorError::Script(_))));
    assert!(job_dir.join("threads_first.sh").is_file());
    assert!(!job_dir.join("threads_first.out").exists());
    assert!(!marker.exists());
}

#[test]
pub fn failed_spawn_still_waits_for_running_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("jobs");
    let marker = dir.path().join("marker");
    let batch = Batch::new(
        [format!("sleep 0.5; touch {}", marker.display()), String::from("true")],
        ["first", "second"],
        &job_dir,
    )
    .unwrap();
    // the second job's output file cannot be created
    fs::create_dir_all(job_dir.join("threads_second.out")).unwrap();

    let result = executor(local_config(&job_dir, None)).execute(&batch);

    assert!(matches!(result, Err(ExecutorError::Io(_))));
    assert!(marker.exists());
}
