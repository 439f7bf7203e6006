//! Output streaming: live handles and ordering.

use crate::prelude::*;
use drover_adapters::ScriptStep;
use drover_core::{Event, SdkMessage};
use drover_engine::TriggerOptions;
use drover_storage::StreamEvent;
use std::time::Duration;

#[tokio::test]
async fn stream_ends_when_running_job_completes() {
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.llm.push_script(vec![
        ScriptStep::Message(SdkMessage::assistant_text("working")),
        ScriptStep::Delay(Duration::from_millis(400)),
        ScriptStep::Message(SdkMessage::assistant_text("done")),
    ]);
    f.manager.initialize().await.unwrap();

    let receipt = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();
    let job_id = receipt.job_id.clone();

    // Subscribe while the job is still running (default ~1s poll)
    let job_manager = f.manager.job_manager().unwrap();
    let mut stream = job_manager.stream_job_output(&job_id);

    receipt.outcome().await;

    // Within ~1.5s of the terminal transition the stream ends, after
    // emitting every persisted message in order
    let mut texts = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(1500);
    loop {
        let event = tokio::time::timeout_at(deadline, stream.next())
            .await
            .expect("stream did not end within 1.5s")
            .expect("stream closed without end");
        match event {
            StreamEvent::Message(message) => texts.push(message),
            StreamEvent::End => break,
            StreamEvent::Error(e) => panic!("stream error: {e}"),
        }
    }
    assert_eq!(texts.len(), 2);
    stream.stop();
}

#[tokio::test]
async fn emitted_output_matches_persisted_output() {
    // job:output order equals the .jsonl line order
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.manager.initialize().await.unwrap();
    let events = record_events(&f);

    let receipt = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();
    let job_id = receipt.job_id.clone();
    receipt.outcome().await;

    let emitted: Vec<SdkMessage> = events
        .lock()
        .iter()
        .filter_map(|e| match e {
            Event::JobOutput { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect();

    let job_manager = f.manager.job_manager().unwrap();
    let (_, output) = job_manager.get_job(&job_id, true).unwrap();
    assert_eq!(output.unwrap(), emitted);
}

#[tokio::test]
async fn streaming_tolerates_malformed_lines() {
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.manager.initialize().await.unwrap();

    let receipt = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();
    let job_id = receipt.job_id.clone();
    receipt.outcome().await;

    // Corrupt one line in the middle of the output log
    let store = drover_storage::JobStore::open(&f.state_dir()).unwrap();
    let path = store.output_path(&job_id);
    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    lines.insert(1, "garbage line");
    std::fs::write(&path, format!("{}\n", lines.join("\n"))).unwrap();

    let job_manager = f.manager.job_manager().unwrap();
    let (_, output) = job_manager.get_job(&job_id, true).unwrap();
    // The three real messages survive; the garbage line is skipped
    assert_eq!(output.unwrap().len(), 3);
}
