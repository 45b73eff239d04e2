use snafu::{ensure, OptionExt};

use crate::{
    config::{flag, InvalidCustomParameterSnafu, Result},
    crd::{FoundationDBCluster, ProcessClass},
};

/// The custom parameters of `process_class` as `--name=value` flags, in declared order.
///
/// A class with its own list does not inherit anything from the `general` list.
pub fn custom_parameters(
    cluster: &FoundationDBCluster,
    process_class: ProcessClass,
) -> Result<Vec<String>> {
    let declared = |process_class| {
        cluster
            .spec
            .processes
            .get(&process_class)
            .and_then(|settings| settings.custom_parameters.as_ref())
    };

    declared(process_class)
        .or_else(|| declared(ProcessClass::General))
        .into_iter()
        .flatten()
        .map(String::as_str)
        .map(normalize)
        .collect()
}

fn normalize(parameter: &str) -> Result<String> {
    let (name, value) = parameter
        .split_once('=')
        .context(InvalidCustomParameterSnafu { parameter })?;
    let name = name.trim();
    let name = name.strip_prefix("--").unwrap_or(name);
    // the legacy start command is split on whitespace
    ensure!(
        !name.is_empty() && !name.contains(char::is_whitespace),
        InvalidCustomParameterSnafu { parameter }
    );

    Ok(flag(name, value.trim()))
}
