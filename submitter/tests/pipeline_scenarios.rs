//! End-to-end pipeline scenarios driven through scripted collaborators.
//!
//! Each test runs `run_pipeline` with a scripted completion client, a scripted
//! judge and a sleeper that records delays instead of waiting.

use std::time::Duration;

use submitter::controller::{RunOutcome, RunRequest, RunStop, Services, run_pipeline};
use submitter::core::types::{Mode, SubmitStatus, TestVerdict};
use submitter::io::config::SubmitterConfig;
use submitter::io::delay::CancelToken;
use submitter::io::submission::parse_choice;
use submitter::logging::LogSink;
use submitter::test_support::{
    RecordingSleeper, ScriptedCompletionClient, ScriptedJudge, returning, sample_task,
    sample_template, test_config,
};

fn run(
    client: &ScriptedCompletionClient,
    judge: &ScriptedJudge,
    sleeper: &RecordingSleeper,
    config: &SubmitterConfig,
    mode: Mode,
    cancel: &CancelToken,
) -> RunOutcome {
    let sink = LogSink::new();
    let services = Services {
        client,
        judge,
        sleeper,
    };
    let request = RunRequest {
        task: &sample_task(),
        template: &sample_template(),
        mode,
        config,
        cancel,
        sink: &sink,
    };
    run_pipeline(&services, &request).expect("pipeline")
}

/// Five completions collapse to one candidate, so exactly one batch of fifteen
/// follows and its indices continue after the first batch.
#[test]
fn single_candidate_batch_escalates_once() {
    let mut first = vec![returning("n + k"); 4];
    first.push(returning(&"n + k + ".repeat(120)));
    let mut second = vec![returning("n * k")];
    second.extend(vec![returning("n + k"); 14]);
    let client = ScriptedCompletionClient::new(vec![first, second]);
    let judge = ScriptedJudge::new().with_submissions(vec![SubmitStatus::Accepted]);

    let outcome = run(
        &client,
        &judge,
        &RecordingSleeper::new(),
        &test_config(),
        Mode::Direct,
        &CancelToken::new(),
    );

    assert_eq!(client.requests(), vec![5, 15]);
    assert_eq!(
        outcome.stop,
        RunStop::Submitted {
            round: 1,
            choice: 0,
            submit_attempts: 1,
        }
    );
    let submitted = judge.submitted().remove(0);
    assert!(submitted.contains("# --- candidate 4 ---"));
    assert!(submitted.contains("# --- candidate 5 ---"));
    assert!(submitted.contains("# --- candidate 19 ---"));
    assert!(!submitted.contains("# --- candidate 20 ---"));
}

/// Three candidates, the second passes: only the second is submitted and the
/// third is never tested.
#[test]
fn tested_mode_submits_first_passing_candidate() {
    let client = ScriptedCompletionClient::new(vec![vec![
        returning("n - k"),
        returning("n + k"),
        returning("n * k"),
    ]]);
    let judge = ScriptedJudge::new()
        .with_verdicts(vec![
            TestVerdict::Fail { exit_code: Some(1) },
            TestVerdict::Pass,
        ])
        .with_submissions(vec![SubmitStatus::Accepted]);

    let outcome = run(
        &client,
        &judge,
        &RecordingSleeper::new(),
        &test_config(),
        Mode::Tested,
        &CancelToken::new(),
    );

    assert_eq!(
        outcome.stop,
        RunStop::Submitted {
            round: 1,
            choice: 1,
            submit_attempts: 1,
        }
    );
    assert_eq!(judge.tested().len(), 2);
    let submitted = judge.submitted();
    assert_eq!(submitted.len(), 1);
    assert!(submitted[0].starts_with("import math\n"));
    assert!(submitted[0].contains("    return n + k\n"));
    assert!(submitted[0].contains("    print(solve(n, k))\n"));
    assert_eq!(parse_choice(&submitted[0]), Some(1));
}

/// Two transient submit failures then success: three submissions separated by
/// two fixed delays.
#[test]
fn transient_submit_failures_retry_with_fixed_delay() {
    let client = ScriptedCompletionClient::new(vec![vec![
        returning("n + k"),
        returning("n * k"),
    ]]);
    let judge = ScriptedJudge::new().with_submissions(vec![
        SubmitStatus::Transient { exit_code: Some(1) },
        SubmitStatus::Transient { exit_code: Some(1) },
        SubmitStatus::Accepted,
    ]);
    let sleeper = RecordingSleeper::new();

    let outcome = run(
        &client,
        &judge,
        &sleeper,
        &test_config(),
        Mode::Direct,
        &CancelToken::new(),
    );

    assert_eq!(
        outcome.stop,
        RunStop::Submitted {
            round: 1,
            choice: 0,
            submit_attempts: 3,
        }
    );
    assert_eq!(judge.submitted().len(), 3);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(500); 2]);
}

/// A round where nothing passes regenerates instead of submitting.
#[test]
fn failed_round_regenerates() {
    let client = ScriptedCompletionClient::new(vec![
        vec![returning("n - k"), returning("n * k")],
        vec![returning("n + k"), returning("n // k")],
    ]);
    let judge = ScriptedJudge::new()
        .with_verdicts(vec![
            TestVerdict::Fail { exit_code: Some(1) },
            TestVerdict::TimedOut,
            TestVerdict::Pass,
        ])
        .with_submissions(vec![SubmitStatus::Accepted]);

    let outcome = run(
        &client,
        &judge,
        &RecordingSleeper::new(),
        &test_config(),
        Mode::Tested,
        &CancelToken::new(),
    );

    assert_eq!(outcome.rounds, 2);
    assert_eq!(
        outcome.stop,
        RunStop::Submitted {
            round: 2,
            choice: 0,
            submit_attempts: 1,
        }
    );
    assert_eq!(client.requests(), vec![5, 5]);
    assert_eq!(judge.download_calls(), 2);
}

/// Every round fails until the cap stops the run.
#[test]
fn round_cap_stops_the_run() {
    let mut config = test_config();
    config.rounds.max_rounds = 2;
    let client = ScriptedCompletionClient::new(vec![
        vec![returning("n - k"), returning("n * k")],
        vec![returning("n - k"), returning("n * k")],
    ]);
    let judge = ScriptedJudge::new().with_verdicts(vec![
        TestVerdict::Fail { exit_code: Some(1) };
        4
    ]);

    let outcome = run(
        &client,
        &judge,
        &RecordingSleeper::new(),
        &config,
        Mode::Tested,
        &CancelToken::new(),
    );

    assert_eq!(outcome.rounds, 2);
    assert_eq!(outcome.stop, RunStop::RoundsExhausted { max_rounds: 2 });
    assert!(judge.submitted().is_empty());
}

/// An empty candidate set counts as a failed round.
#[test]
fn empty_candidate_set_counts_against_the_cap() {
    let mut config = test_config();
    config.rounds.max_rounds = 1;
    let too_long = returning(&"n + k + ".repeat(120));
    let client = ScriptedCompletionClient::new(vec![
        vec![too_long.clone()],
        vec![too_long],
    ]);
    let judge = ScriptedJudge::new();

    let outcome = run(
        &client,
        &judge,
        &RecordingSleeper::new(),
        &config,
        Mode::Direct,
        &CancelToken::new(),
    );

    assert_eq!(outcome.stop, RunStop::RoundsExhausted { max_rounds: 1 });
    assert!(judge.submitted().is_empty());
}

#[test]
fn terminal_rejection_stops_the_run() {
    let client = ScriptedCompletionClient::new(vec![vec![
        returning("n + k"),
        returning("n * k"),
    ]]);
    let judge = ScriptedJudge::new().with_submissions(vec![SubmitStatus::Rejected {
        exit_code: Some(2),
        reason: "not logged in".to_string(),
    }]);
    let sleeper = RecordingSleeper::new();

    let outcome = run(
        &client,
        &judge,
        &sleeper,
        &test_config(),
        Mode::Direct,
        &CancelToken::new(),
    );

    assert_eq!(
        outcome.stop,
        RunStop::Rejected {
            round: 1,
            exit_code: Some(2),
            reason: "not logged in".to_string(),
        }
    );
    assert!(sleeper.delays().is_empty());
}

#[test]
fn cancellation_during_submit_delay_stops_the_run() {
    let client = ScriptedCompletionClient::new(vec![vec![
        returning("n + k"),
        returning("n * k"),
    ]]);
    let judge = ScriptedJudge::new().with_submissions(vec![
        SubmitStatus::Transient { exit_code: None };
        5
    ]);
    let cancel = CancelToken::new();

    let outcome = run(
        &client,
        &judge,
        &RecordingSleeper::cancelling_on(2),
        &test_config(),
        Mode::Direct,
        &cancel,
    );

    assert_eq!(outcome.stop, RunStop::Cancelled);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(judge.submitted().len(), 2);
    assert!(cancel.is_cancelled());
}

#[test]
fn cancelled_before_start_does_no_work() {
    let client = ScriptedCompletionClient::new(Vec::new());
    let judge = ScriptedJudge::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let outcome = run(
        &client,
        &judge,
        &RecordingSleeper::new(),
        &test_config(),
        Mode::Direct,
        &cancel,
    );

    assert_eq!(outcome, RunOutcome { rounds: 0, stop: RunStop::Cancelled });
    assert!(client.requests().is_empty());
}
