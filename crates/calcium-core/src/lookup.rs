//! Static lookup enumerations. The initial migration seeds one table per
//! enum with exactly these values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// External tool that produces the processed output for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMethod {
    Suite2p,
    Caiman,
}

impl ProcessingMethod {
    pub const ALL: [ProcessingMethod; 2] = [ProcessingMethod::Suite2p, ProcessingMethod::Caiman];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::Suite2p => "suite2p",
            ProcessingMethod::Caiman => "caiman",
        }
    }
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suite2p" => Ok(ProcessingMethod::Suite2p),
            "caiman" => Ok(ProcessingMethod::Caiman),
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }
}

/// Cell compartments that can be imaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellCompartment {
    Axon,
    Soma,
    Bouton,
}

impl CellCompartment {
    pub const ALL: [CellCompartment; 3] = [
        CellCompartment::Axon,
        CellCompartment::Soma,
        CellCompartment::Bouton,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CellCompartment::Axon => "axon",
            CellCompartment::Soma => "soma",
            CellCompartment::Bouton => "bouton",
        }
    }
}

impl fmt::Display for CellCompartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellCompartment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellCompartment::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownLookup {
                table: "cell_compartment",
                value: s.to_string(),
            })
    }
}

/// Possible classifications for a segmented mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiType {
    Soma,
    Axon,
    Dendrite,
    Neuropil,
    Artifact,
    Unknown,
}

impl RoiType {
    pub const ALL: [RoiType; 6] = [
        RoiType::Soma,
        RoiType::Axon,
        RoiType::Dendrite,
        RoiType::Neuropil,
        RoiType::Artifact,
        RoiType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoiType::Soma => "soma",
            RoiType::Axon => "axon",
            RoiType::Dendrite => "dendrite",
            RoiType::Neuropil => "neuropil",
            RoiType::Artifact => "artifact",
            RoiType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RoiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoiType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoiType::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::UnknownLookup {
                table: "roi_type",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_method_parse() {
        assert_eq!(
            "suite2p".parse::<ProcessingMethod>().unwrap(),
            ProcessingMethod::Suite2p
        );
        assert_eq!(
            "caiman".parse::<ProcessingMethod>().unwrap(),
            ProcessingMethod::Caiman
        );
    }

    #[test]
    fn test_unknown_method_is_error() {
        match "scanbox".parse::<ProcessingMethod>() {
            Err(Error::UnknownMethod(m)) => assert_eq!(m, "scanbox"),
            other => panic!("expected UnknownMethod, got {:?}", other),
        }
    }

    #[test]
    fn test_roi_type_names_round_trip() {
        for roi in RoiType::ALL {
            assert_eq!(roi.to_string().parse::<RoiType>().unwrap(), roi);
        }
        assert!("glia".parse::<RoiType>().is_err());
    }

    #[test]
    fn test_cell_compartment_rejects_case_mismatch() {
        assert!("Soma".parse::<CellCompartment>().is_err());
        assert_eq!(
            "bouton".parse::<CellCompartment>().unwrap(),
            CellCompartment::Bouton
        );
    }
}
