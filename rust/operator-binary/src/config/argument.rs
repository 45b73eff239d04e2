use serde::{Deserialize, Serialize};

use crate::process_client::{self, ProcessClient};

/// One startup argument of `fdbserver`, or a part of one.
///
/// The monitor resolves [`Argument::Environment`] and [`Argument::ProcessNumber`] itself when it
/// starts a process, so serialising an argument defers its resolution. [`Argument::resolve`]
/// evaluates it right away instead.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Argument {
    #[serde(rename = "Value")]
    Literal { value: String },

    /// The parts joined without a separator, in order.
    #[serde(rename = "Concatenate")]
    Concatenation { values: Vec<Argument> },

    /// The value of an environment variable of the process.
    #[serde(rename = "Environment")]
    Environment { source: String },

    /// `offset + multiplier * process_number`
    #[serde(rename = "ProcessNumber")]
    ProcessNumber {
        #[serde(default)]
        offset: i64,
        #[serde(default = "default_multiplier")]
        multiplier: i64,
    },
}

fn default_multiplier() -> i64 {
    1
}

impl Argument {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn environment(source: impl Into<String>) -> Self {
        Self::Environment {
            source: source.into(),
        }
    }

    pub fn process_number(offset: i64, multiplier: i64) -> Self {
        Self::ProcessNumber { offset, multiplier }
    }

    /// Joins `parts`, leaving out empty literals.
    pub fn concatenate(parts: impl IntoIterator<Item = Argument>) -> Self {
        Self::Concatenation {
            values: parts
                .into_iter()
                .filter(|part| !matches!(part, Self::Literal { value } if value.is_empty()))
                .collect(),
        }
    }

    /// The flag this argument sets, e.g. `class` for `--class=storage`.
    pub fn flag_name(&self) -> Option<&str> {
        match self {
            Self::Literal { value } => value.strip_prefix("--")?.split('=').next(),
            Self::Concatenation { values } => values.first()?.flag_name(),
            Self::Environment { .. } | Self::ProcessNumber { .. } => None,
        }
    }

    /// Evaluates the argument for the process with the given 1-based number.
    pub fn resolve(
        &self,
        process_number: u16,
        client: &dyn ProcessClient,
    ) -> Result<String, process_client::Error> {
        match self {
            Self::Literal { value } => Ok(value.clone()),
            Self::Concatenation { values } => values
                .iter()
                .map(|part| part.resolve(process_number, client))
                .collect(),
            Self::Environment { source } => client.get_environment_value(source),
            Self::ProcessNumber { offset, multiplier } => {
                Ok((offset + multiplier * i64::from(process_number)).to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::process_client::SubstitutionProcessClient;

    fn public_address() -> Argument {
        Argument::concatenate([
            Argument::literal("--public_address=["),
            Argument::environment("FDB_PUBLIC_IP"),
            Argument::literal("]:"),
            Argument::process_number(4499, 2),
        ])
    }

    #[test]
    fn test_concatenate_drops_empty_literals() {
        let argument = Argument::concatenate([
            Argument::literal(""),
            Argument::literal("--locality_zoneid="),
            Argument::literal(""),
            Argument::environment("RACK"),
        ]);

        assert_eq!(
            argument,
            Argument::Concatenation {
                values: vec![
                    Argument::literal("--locality_zoneid="),
                    Argument::environment("RACK"),
                ]
            }
        );
    }

    #[test]
    fn test_flag_name() {
        assert_eq!(Argument::literal("--class=storage").flag_name(), Some("class"));
        assert_eq!(public_address().flag_name(), Some("public_address"));
        assert_eq!(Argument::environment("FDB_POD_IP").flag_name(), None);
        assert_eq!(Argument::literal("storage").flag_name(), None);
    }

    #[test]
    fn test_resolve() {
        let client = SubstitutionProcessClient::new(BTreeMap::from([(
            "FDB_PUBLIC_IP".to_string(),
            "10.1.0.4".to_string(),
        )]));

        assert_eq!(
            public_address().resolve(3, &client).unwrap(),
            "--public_address=[10.1.0.4]:4505"
        );
        assert_eq!(
            Argument::process_number(0, 1).resolve(2, &client).unwrap(),
            "2"
        );
        assert!(Argument::environment("FDB_ZONE_ID")
            .resolve(1, &client)
            .is_err());
    }

    #[test]
    fn test_serialize_for_monitor() {
        let serialized = serde_json::to_value(public_address()).unwrap();

        assert_eq!(
            serialized,
            json!({
                "type": "Concatenate",
                "values": [
                    {"type": "Value", "value": "--public_address=["},
                    {"type": "Environment", "source": "FDB_PUBLIC_IP"},
                    {"type": "Value", "value": "]:"},
                    {"type": "ProcessNumber", "offset": 4499, "multiplier": 2},
                ]
            })
        );
        let deserialized: Argument = serde_json::from_value(serialized).unwrap();
        assert_eq!(deserialized, public_address());
    }

    #[test]
    fn test_process_number_defaults() {
        let argument: Argument = serde_json::from_value(json!({"type": "ProcessNumber"})).unwrap();

        assert_eq!(argument, Argument::process_number(0, 1));
    }
}
