use std::fs;
use std::path::PathBuf;

use pulldown_cmark::{Parser, html};

use lab_core::model::ProgressRecord;

use crate::error::ExportError;

/// Renders a frozen record into a standalone HTML document the student
/// can keep or hand in.
///
/// Export never touches activity state: a failure is reported once to the
/// user and the action can simply be retried.
pub struct ReportExporter {
    out_dir: PathBuf,
}

impl ReportExporter {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Write the report document and return its path.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if the output directory cannot be created or
    /// the file cannot be written.
    pub fn export(&self, record: &ProgressRecord) -> Result<PathBuf, ExportError> {
        let markdown = render_markdown(record);
        let mut body = String::new();
        html::push_html(&mut body, Parser::new(&markdown));

        let page = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>Lab report - {name}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
            name = record.identity().name(),
        );

        fs::create_dir_all(&self.out_dir)?;
        let file = self.out_dir.join(format!(
            "lab_report_{}.html",
            record.identity().name().replace(' ', "_")
        ));
        fs::write(&file, page)?;
        Ok(file)
    }
}

fn render_markdown(record: &ProgressRecord) -> String {
    let safety = if record.safety().is_correct() {
        "Correct"
    } else {
        "Incorrect"
    };
    format!(
        "# Virtual Metallurgy Lab Report\n\n\
![avatar]({avatar})\n\n\
**Student:** {name}  \n\
**Course:** {course}  \n\
**Date:** {completed_at}\n\n\
## Total score: {score} / 100\n\n\
## Results summary\n\n\
- Calculated apparent density: {density:.2} g/cm³\n\
- Mineral identification: {mineral}\n\
- Justification: \"{justification}\"\n\
- Safety answer: {safety}\n\
- Sample label: {sample_id} | {label_date} | {material}\n\n\
## Report summary\n\n\
{report}\n\n\
## Procedure proposed by the student\n\n\
> {procedure}\n\n\
---\n\
Virtual Metallurgy Laboratory\n",
        avatar = record.identity().avatar().url(),
        name = record.identity().name(),
        course = record.identity().course(),
        completed_at = record.completed_at().format("%Y-%m-%d %H:%M UTC"),
        score = record.score(),
        density = record.apparent_density(),
        mineral = record.mineral(),
        justification = record.justification(),
        safety = safety,
        sample_id = record.label().sample_id(),
        label_date = record.label().date(),
        material = record.label().material(),
        report = record.report(),
        procedure = record.procedure(),
    )
}
