//! One-shot in-process chat: run a query through the full pipeline and
//! print each event as it arrives.

use anyhow::Result;
use uuid::Uuid;

use mnemo_config::MnemoConfig;
use mnemo_core::{ChatRequest, PipelineEvent};

pub async fn run(config: &MnemoConfig, query: String, session: Option<String>) -> Result<()> {
    let pipeline = mnemo_agent::build_pipeline(config)?;

    let session_id = session
        .unwrap_or_else(|| format!("cli-{}", &Uuid::new_v4().simple().to_string()[..8]));
    println!("Session: {session_id}");

    let mut rx = pipeline.spawn(ChatRequest {
        query,
        session_id,
        messages: Vec::new(),
    });

    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::PipelineStep(step) => println!("· {step}"),
            PipelineEvent::Summary(summary) => {
                println!("\n[session summary]");
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            PipelineEvent::QueryUnderstanding(understanding) => {
                if let (true, Some(rewritten)) =
                    (understanding.is_ambiguous, &understanding.rewritten_query)
                {
                    println!("· Rewritten query: {rewritten}");
                }
            }
            PipelineEvent::ClarifyingQuestions(questions) => {
                println!("\nClarifying questions:");
                for (i, question) in questions.iter().enumerate() {
                    println!("  {}. {question}", i + 1);
                }
            }
            PipelineEvent::Answer(answer) => println!("\n{answer}"),
        }
    }

    Ok(())
}
