use std::path::{Path, PathBuf};

use anyhow::Context;
use domain::model::entity::{
    card::EffectiveSetting,
    descriptor::{self, expand_macros, JobMacros},
    CardStack, DescriptorTemplate, JobDescriptor, ParameterCard,
};

use crate::cli::{CardArgs, RenderArgs};

/// Fill in the template and check the result is a usable descriptor. A
/// relative `executable` is pointed at `wrapper`.
pub fn render_descriptor(template: &str, wrapper: &Path, args: &RenderArgs) -> anyhow::Result<String> {
    let mut rendered = DescriptorTemplate::new(template).render(&args.log_dir, &args.log_file);
    if args.cluster.is_some() || args.process.is_some() || args.opts.is_some() {
        let macros = JobMacros {
            cluster: args.cluster.unwrap_or_default(),
            process: args.process.unwrap_or_default(),
            opts: args.opts.as_deref().unwrap_or_default(),
        };
        rendered = expand_macros(&rendered, &macros);
    }
    let job = JobDescriptor::parse(&rendered).context("Rendered descriptor is not valid")?;
    if Path::new(&job.executable).is_relative() {
        rendered = descriptor::set_value(&rendered, "executable", &wrapper.to_string_lossy());
    }
    Ok(rendered)
}

/// Cards in the order the generator reads them.
pub fn card_paths(common_card: &Path, args: &CardArgs) -> Vec<PathBuf> {
    let common = args.with_common.then(|| common_card.to_path_buf());
    common.into_iter().chain(args.cards.iter().cloned()).collect()
}

/// Stack `(name, text)` cards and resolve the settings the generator ends
/// up with.
pub fn effective_settings(
    cards: &[(String, String)],
    require_process: bool,
) -> anyhow::Result<Vec<EffectiveSetting>> {
    let mut stack = CardStack::default();
    for (name, text) in cards {
        let card = ParameterCard::parse(text).with_context(|| format!("Cannot parse card {name}"))?;
        stack.push(name.as_str(), card);
    }
    stack.validate_beams()?;
    if !stack.selects_processes() {
        if require_process {
            anyhow::bail!("No card switches on a physics process");
        }
        tracing::warn!("No card switches on a physics process, the generator will do nothing");
    }
    Ok(stack.effective())
}

/// Status `mcsub` exits with after running a job. Codes a process can't
/// exit with become 1.
pub fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
