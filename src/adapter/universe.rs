//! Universe file loader.
//!
//! The universe is built out-of-band and handed over as JSON: either a bare
//! list of baskets or an object with a `baskets` list.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::domain::{BasketSpec, Universe};
use crate::error::{ConfigError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum UniverseFile {
    List(Vec<BasketSpec>),
    Wrapped { baskets: Vec<BasketSpec> },
}

impl UniverseFile {
    fn into_specs(self) -> Vec<BasketSpec> {
        match self {
            Self::List(specs) | Self::Wrapped { baskets: specs } => specs,
        }
    }
}

fn check_cap(field: &'static str, actual: usize, limit: usize) -> Result<()> {
    if limit > 0 && actual > limit {
        return Err(ConfigError::UniverseTooLarge {
            field,
            actual,
            limit,
        }
        .into());
    }
    Ok(())
}

/// Parse and validate a universe from JSON text.
///
/// `max_baskets` and `max_tokens` of zero mean unlimited.
pub fn parse_universe(
    text: &str,
    origin: &str,
    max_baskets: usize,
    max_tokens: usize,
) -> Result<Universe> {
    let file: UniverseFile =
        serde_json::from_str(text).map_err(|source| ConfigError::ParseUniverse {
            path: origin.to_string(),
            source,
        })?;
    let specs = file.into_specs();
    check_cap("max_baskets", specs.len(), max_baskets)?;

    let universe = Universe::from_specs(specs)?;
    check_cap("max_tokens", universe.token_ids().len(), max_tokens)?;
    Ok(universe)
}

/// Read, parse and validate the universe file at `path`.
pub fn load_universe(path: &Path, max_baskets: usize, max_tokens: usize) -> Result<Universe> {
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadUniverse {
        path: origin.clone(),
        source,
    })?;
    let universe = parse_universe(&text, &origin, max_baskets, max_tokens)?;
    info!(
        path = %origin,
        baskets = universe.len(),
        tokens = universe.token_ids().len(),
        "Universe loaded"
    );
    Ok(universe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::{BasketKey, Strategy};
    use crate::error::Error;

    const TWO_BASKETS: &str = r#"[
        {
            "key": "winner",
            "title": "Who wins",
            "strategy": "buy_all_yes",
            "legs": [
                {"token_id": "a-yes", "condition_id": "a", "label": "A", "side": "yes"},
                {"token_id": "b-yes", "condition_id": "b", "label": "B", "side": "yes"}
            ]
        },
        {
            "key": "a-pair",
            "title": "A both sides",
            "strategy": "yes_no_pair",
            "legs": [
                {"token_id": "a-yes", "condition_id": "a", "label": "A yes", "side": "yes"},
                {"token_id": "a-no", "condition_id": "a", "label": "A no", "side": "no"}
            ],
            "meta": {"tick_size": "0.001"}
        }
    ]"#;

    #[test]
    fn parses_a_bare_list() {
        let universe = parse_universe(TWO_BASKETS, "inline", 0, 0).unwrap();
        assert_eq!(universe.len(), 2);
        assert_eq!(universe.token_ids().len(), 3);
        assert_eq!(
            universe.get(&BasketKey::from("a-pair")).unwrap().strategy(),
            Strategy::YesNoPair
        );
    }

    #[test]
    fn parses_a_wrapped_list() {
        let text = format!(r#"{{"baskets": {TWO_BASKETS}}}"#);
        let universe = parse_universe(&text, "inline", 0, 0).unwrap();
        assert_eq!(universe.len(), 2);
    }

    #[test]
    fn rejects_unknown_strategy_tag() {
        let text = TWO_BASKETS.replace("buy_all_yes", "buy_everything");
        let err = parse_universe(&text, "inline", 0, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Domain(DomainError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn enforces_caps() {
        let err = parse_universe(TWO_BASKETS, "inline", 1, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UniverseTooLarge { field: "max_baskets", actual: 2, limit: 1 })
        ));

        let err = parse_universe(TWO_BASKETS, "inline", 0, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UniverseTooLarge { field: "max_tokens", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_universe(&dir.path().join("nope.json"), 0, 0).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ReadUniverse { .. })));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("universe.json");
        std::fs::write(&path, TWO_BASKETS).unwrap();
        assert_eq!(load_universe(&path, 0, 0).unwrap().len(), 2);
    }
}
