use anyhow::{Context, Result};
use hkw_attest::{AttestationBuilder, Subject};

use crate::cli::OutputFormat;
use crate::project::Project;

pub(crate) fn handle_attest(
    project: &Project,
    operation: &str,
    subjects: Vec<(String, String)>,
    files: Vec<(String, String)>,
    format: OutputFormat,
) -> Result<()> {
    let mut all: Vec<Subject> = subjects
        .into_iter()
        .map(|(name, digest)| Subject::new(name, digest))
        .collect();
    for (name, path) in files {
        let path = project.root().join(path);
        let subject = Subject::from_file(&name, &path)
            .with_context(|| format!("Failed to hash subject '{name}'"))?;
        all.push(subject);
    }

    let builder = AttestationBuilder::from_settings(
        &project.settings.attestation,
        &project.paths.attestation_dir,
    );
    let attestation = builder.build(operation, all)?;
    let path = builder.export(&attestation)?;

    match format {
        OutputFormat::Text => {
            println!("{}", path.display());
            for subject in attestation.subjects() {
                let digest = subject.sha256().unwrap_or("-");
                println!("  {} sha256:{digest}", subject.name);
            }
        }
        OutputFormat::Json => println!("{}", attestation.to_json_pretty()?),
    }
    Ok(())
}
