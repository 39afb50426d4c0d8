//! Console front-end for the virtual metallurgy lab.
//!
//! Walks one student through the ten stages on stdin/stdout, then offers
//! an HTML export of the frozen record. All activity logic lives in the
//! services crate; this binary only renders prompts and relays input.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::Arc;

use lab_core::Clock;
use lab_core::model::{
    AvatarId, Equipment, Measurement, Mineral, Ppe, ProgressRecord, StudentIdentity,
};
use services::{
    ActivityLoopService, ActivitySession, AiFeedbackService, FeedbackProvider, ReportExporter,
    ScriptedFeedback, Stage, Submission,
};
use storage::repository::Storage;

const DATABASE_URL: &str = "sqlite:ore_lab.db?mode=rwc";
const EXPORT_DIR: &str = "reports";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let storage = Storage::sqlite(DATABASE_URL).await?;
    let feedback: Arc<dyn FeedbackProvider> = {
        let service = AiFeedbackService::from_env();
        if service.enabled() {
            Arc::new(service)
        } else {
            println!("LAB_AI_API_KEY is not set; using the built-in lab assistant.\n");
            Arc::new(ScriptedFeedback::default())
        }
    };
    let service =
        ActivityLoopService::new(Clock::default_clock(), feedback, storage.records.clone());

    // A frozen record re-renders read-only; a partial one never resumes.
    if let Some(record) = service.load_completed().await {
        println!("A completed run is already on file.\n");
        print_summary(&record);
        offer_export(&record)?;
        return Ok(());
    }

    println!("=== Virtual Metallurgy Lab: density of an ore sample ===\n");
    let identity = register()?;
    let mut session = service.start(identity);

    while !session.is_complete() {
        let stage = session.current_stage();
        let progress = session.progress();
        println!(
            "\n--- Step {}/{}: {} ---",
            progress.step,
            progress.total,
            stage.title()
        );
        run_stage(&service, &mut session, stage).await?;
    }

    if let Some(record) = session.record() {
        println!();
        print_summary(record);
        offer_export(record)?;
    }
    Ok(())
}

async fn run_stage(
    service: &ActivityLoopService,
    session: &mut ActivitySession,
    stage: Stage,
) -> anyhow::Result<()> {
    match stage {
        Stage::Equipment => {
            println!("Pick the items you need to measure mass and volume by displacement.");
            for (i, item) in Equipment::ALL.iter().enumerate() {
                println!("  {}. {item}", i + 1);
            }
            let selected = read_equipment()?;
            report(session.submit_equipment(selected)?);
        }
        Stage::Procedure => {
            let text = prompt("Describe your procedure: ")?;
            println!("Sending your procedure for review...");
            report(service.submit_procedure(session, &text).await?);
        }
        Stage::Feedback => {
            if let Some(feedback) = session.feedback() {
                println!("Assistant feedback:\n{feedback}");
            }
            prompt("Press Enter to continue to the safety check.")?;
            session.acknowledge_feedback()?;
        }
        Stage::Safety => {
            println!("Which protective item is indispensable for almost any procedure?");
            let answer = choose(&Ppe::ALL, |ppe| ppe.label().to_owned())?;
            report(session.submit_safety(answer)?);
        }
        Stage::DataRequest => {
            println!("Ask the assistant for each reading, then calculate.");
            for (i, m) in Measurement::ALL.iter().enumerate() {
                println!("  {}. Request the {m}", i + 1);
            }
            println!("  4. Calculate the density");
            let choice = prompt("> ")?;
            match choice.as_str() {
                "1" | "2" | "3" => {
                    let idx = choice.parse::<usize>().unwrap_or(1) - 1;
                    let measurement = Measurement::ALL[idx];
                    let value = session.request_measurement(measurement)?;
                    let unit = if measurement == Measurement::Mass { "g" } else { "mL" };
                    println!("Assistant: the {measurement} is {value} {unit}.");
                }
                "4" => report(session.confirm_measurements()?),
                _ => println!("Pick 1-4."),
            }
        }
        Stage::Density => {
            let lab = session.measurements();
            println!(
                "Mass = {} g, displaced volume = {} mL. Density = mass / volume.",
                lab.mass(),
                lab.displaced_volume()
            );
            let guess = prompt("Your result in g/cm³: ")?;
            report(session.submit_density(&guess)?);
        }
        Stage::MineralId => {
            if let Some(density) = session.user_density() {
                println!("Your result is {density:.2} g/cm³. Which mineral is the sample?");
            }
            let choice = choose(&Mineral::ALL, |m| {
                format!("{}: {}", m.label(), m.density_label())
            })?;
            report(session.identify_mineral(choice)?);
        }
        Stage::Justification => {
            let text = prompt("In one sentence, why that mineral? ")?;
            report(session.submit_justification(&text)?);
        }
        Stage::Labeling => {
            let label = session.label_preview();
            println!("SAMPLE LABEL");
            println!("  id:       {}", label.sample_id());
            println!("  date:     {}", label.date());
            println!("  material: {}", label.material());
            prompt("Press Enter to confirm the label and generate the report summary.")?;
            println!("Generating the report summary...");
            service.finalize(session).await?;
        }
        // Completion is handled by `finalize`; the loop exits before
        // prompting for this stage.
        Stage::Report => {}
    }
    Ok(())
}

fn register() -> anyhow::Result<StudentIdentity> {
    loop {
        let name = prompt("Full name: ")?;
        let course = prompt("Course: ")?;
        println!("Choose your avatar:");
        let avatars: Vec<AvatarId> = (1..=AvatarId::MAX)
            .filter_map(|n| AvatarId::new(n).ok())
            .collect();
        let avatar = choose(&avatars, |a| a.url())?;
        match StudentIdentity::new(name, course, avatar) {
            Ok(identity) => return Ok(identity),
            Err(err) => println!("{err}. Please try again."),
        }
    }
}

fn read_equipment() -> anyhow::Result<BTreeSet<Equipment>> {
    loop {
        let line = prompt("Item numbers, separated by spaces: ")?;
        let mut selected = BTreeSet::new();
        let mut valid = true;
        for token in line.split_whitespace() {
            match token.parse::<usize>() {
                Ok(n) if (1..=Equipment::ALL.len()).contains(&n) => {
                    selected.insert(Equipment::ALL[n - 1]);
                }
                _ => {
                    valid = false;
                    break;
                }
            }
        }
        if valid {
            return Ok(selected);
        }
        println!("Use numbers between 1 and {}.", Equipment::ALL.len());
    }
}

fn choose<T: Copy>(items: &[T], describe: impl Fn(&T) -> String) -> anyhow::Result<T> {
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, describe(item));
    }
    loop {
        let line = prompt("> ")?;
        if let Ok(n) = line.parse::<usize>() {
            if (1..=items.len()).contains(&n) {
                return Ok(items[n - 1]);
            }
        }
        println!("Pick a number between 1 and {}.", items.len());
    }
}

fn report(outcome: Submission) {
    match outcome {
        Submission::Accepted => {}
        Submission::Rejected(reason) => println!("{reason}"),
    }
}

fn print_summary(record: &ProgressRecord) {
    println!("=== Summary for {} ({}) ===", record.identity().name(), record.identity().course());
    println!("Score: {} / 100", record.score());
    println!(
        "Apparent density: {:.2} g/cm³ (your answer: {:.2})",
        record.apparent_density(),
        record.user_density()
    );
    println!("Identification: {}", record.mineral());
    println!(
        "Safety answer: {}",
        if record.safety().is_correct() { "correct" } else { "incorrect" }
    );
    println!("\nReport summary:\n{}", record.report());
}

fn offer_export(record: &ProgressRecord) -> anyhow::Result<()> {
    let answer = prompt("\nExport the report as HTML? [y/N] ")?;
    if answer.eq_ignore_ascii_case("y") {
        match ReportExporter::new(EXPORT_DIR).export(record) {
            Ok(path) => println!("Report written to {}", path.display()),
            // retryable: the record is untouched, only the download failed
            Err(err) => println!("Could not export the report: {err}"),
        }
    }
    Ok(())
}

fn prompt(message: &str) -> io::Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}
