//! Cross-linked markdown export for generated procedures.
//!
//! Each export writes one procedure page under the generated directory and
//! one reference page per step under the reference directory (created on
//! first use, never overwritten). Both directories keep an index.md listing
//! their pages.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Local;

use crate::error::Result;
use crate::graph::StepAnnotation;

/// Exporter bound to a pair of output directories.
#[derive(Debug, Clone)]
pub struct ProcedureExporter {
    generated_dir: PathBuf,
    reference_dir: PathBuf,
}

impl ProcedureExporter {
    pub fn new(generated_dir: impl Into<PathBuf>, reference_dir: impl Into<PathBuf>) -> Self {
        Self {
            generated_dir: generated_dir.into(),
            reference_dir: reference_dir.into(),
        }
    }

    /// Write a procedure page plus reference pages for its steps.
    ///
    /// The file stem is `filename_slug` when given, otherwise a timestamped
    /// `procedure-YYYYMMDD-HHMMSS` name. Returns the path of the procedure
    /// page.
    pub fn export(
        &self,
        query_text: &str,
        steps: &[StepAnnotation],
        filename_slug: Option<&str>,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.generated_dir)?;
        std::fs::create_dir_all(&self.reference_dir)?;

        let stem = match filename_slug {
            Some(slug) => slug.to_string(),
            None => Local::now().format("procedure-%Y%m%d-%H%M%S").to_string(),
        };
        let outfile = self.generated_dir.join(format!("{}.md", stem));

        let mut step_links: BTreeMap<&str, String> = BTreeMap::new();
        for step in steps {
            let slug = slugify(&step.label);
            let ref_file = self.reference_dir.join(format!("{}.md", slug));
            if !ref_file.exists() {
                std::fs::write(&ref_file, reference_content(&slug, &step.label))?;
            }
            step_links.insert(step.label.as_str(), format!("../reference/{}.md", slug));
        }

        let mut lines = vec![
            "# Generated Procedure\n".to_string(),
            "\n".to_string(),
            format!("Query: {}\n", query_text),
            "\n".to_string(),
            "## Steps\n".to_string(),
        ];
        for (idx, step) in steps.iter().enumerate() {
            let link = &step_links[step.label.as_str()];
            let hint = step.hint();
            if hint.is_empty() {
                lines.push(format!("{}. [{}]({})\n", idx + 1, step.label, link));
            } else {
                lines.push(format!("{}. [{}]({}) — {}\n", idx + 1, step.label, link, hint));
            }
        }

        std::fs::write(&outfile, lines.concat())?;
        self.update_generated_index(&stem)?;
        self.refresh_reference_index()?;
        log::info!("Exported procedure to {}", outfile.display());
        Ok(outfile)
    }

    /// Append a link to generated/index.md for the new file if absent.
    fn update_generated_index(&self, stem: &str) -> Result<()> {
        let index_file = self.generated_dir.join("index.md");
        let mut content = if index_file.exists() {
            std::fs::read_to_string(&index_file)?
        } else {
            "# Generated Procedures\n\n".to_string()
        };
        let link_line = format!("- [{}]({}.md)\n", stem, stem);
        if !content.contains(&link_line) {
            content.push_str(&link_line);
            std::fs::write(&index_file, content)?;
        }
        Ok(())
    }

    /// Regenerate the reference index from the pages on disk.
    fn refresh_reference_index(&self) -> Result<()> {
        let mut entries: Vec<String> = Vec::new();
        let mut stems: Vec<String> = std::fs::read_dir(&self.reference_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let stem = path.file_stem()?.to_str()?.to_string();
                (path.extension().and_then(|e| e.to_str()) == Some("md") && stem != "index")
                    .then_some(stem)
            })
            .collect();
        stems.sort();
        for stem in stems {
            entries.push(format!("- [{}]({}.md)\n", title_case(&stem), stem));
        }

        let mut content = String::from("# Reference\n\nBrowse reference pages for steps and entities.\n\n");
        content.push_str(&entries.concat());
        std::fs::write(self.reference_dir.join("index.md"), content)?;
        Ok(())
    }
}

/// Lowercase alphanumerics, everything else collapsed to single dashes.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push('-');
        }
    }
    while out.contains("--") {
        out = out.replace("--", "-");
    }
    out.trim_matches('-').to_string()
}

fn title_case(slug: &str) -> String {
    slug.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Initial reference page content: the built-in corpus for known demo
/// steps, a skeleton page otherwise.
fn reference_content(slug: &str, step: &str) -> String {
    for (known_slug, content) in REFERENCE_CONTENT {
        if *known_slug == slug {
            return content.to_string();
        }
    }
    format!("# {}\n\nReference page for {}.\n", step, step)
}

const REFERENCE_CONTENT: &[(&str, &str)] = &[
    (
        "verify-credit-score",
        "# Verify Credit Score\n\n\
         Purpose: Retrieve and validate applicant credit report.\n\n\
         Role: Underwriter\n\n\
         System: Credit Bureau API\n\n\
         ## Sub-steps\n\
         1. Confirm applicant identity\n\
         2. Query Credit Bureau API\n\
         3. Validate report and score thresholds\n\
         4. Record findings in case file\n",
    ),
    (
        "request-appraisal",
        "# Request Appraisal\n\n\
         Purpose: Initiate property appraisal request.\n\n\
         Role: Appraiser\n\n\
         System: Property Database API\n\n\
         ## Sub-steps\n\
         1. Verify property address and parcel\n\
         2. Submit appraisal order\n\
         3. Track appraisal status\n",
    ),
    (
        "rural-property-appraisal",
        "# Rural Property Appraisal\n\n\
         Purpose: Additional appraisal checks for rural properties.\n\n\
         Context: Rural Property\n\n\
         Requires: Special Appraisal Form\n\n\
         ## Sub-steps\n\
         1. Collect rural-specific comparables\n\
         2. Complete special appraisal form\n\
         3. Attach addendum to appraisal\n",
    ),
    (
        "check-nm-mortgage-rule-12",
        "# Check NM Mortgage Rule 12\n\n\
         Purpose: Ensure NM-specific disclosure compliance.\n\n\
         Context: New Mexico\n\n\
         System: Regulatory DB\n\n\
         ## Sub-steps\n\
         1. Retrieve latest MR12 requirements\n\
         2. Confirm disclosures present\n\
         3. Record compliance evidence\n",
    ),
    (
        "generate-approval-document",
        "# Generate Approval Document\n\n\
         Purpose: Produce final approval document for borrower.\n\n\
         Role: Loan Officer\n\n\
         System: Document Gen API\n\n\
         ## Sub-steps\n\
         1. Assemble case data\n\
         2. Generate document via API\n\
         3. QA review and send\n",
    ),
];
