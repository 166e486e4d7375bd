//! Preprocessing passes applied to a force field before a fit.
//!
//! The passes run in a fixed order and are not reversible; any failure
//! (missing handler, malformed pattern, unmatched SMIRKS) aborts the whole
//! preparation.

use super::document::{DocumentError, ForceFieldDocument, SectionBody};
use super::smirks::{self, SmirksError};
use thiserror::Error;
use tracing::{debug, info};

/// Identifier fragment of the water parameters displaced by the new model.
const STALE_WATER_ID_FRAGMENT: &str = "tip3p";

const VDW_SECTION: &str = "vdW";
const LIBRARY_CHARGES_SECTION: &str = "LibraryCharges";

const PARAMETERIZE_ATTRIBUTE: &str = "parameterize";
const PARAMETERIZE_TARGETS: &str = "epsilon, rmin_half";

/// vdW patterns tuned during the fit.
pub const PARAMETERS_TO_OPTIMIZE: [&str; 16] = [
    "[#16:1]",
    "[#17:1]",
    "[#1:1]-[#6X3]",
    "[#1:1]-[#6X3](~[#7,#8,#9,#16,#17,#35])~[#7,#8,#9,#16,#17,#35]",
    "[#1:1]-[#6X3]~[#7,#8,#9,#16,#17,#35]",
    "[#1:1]-[#6X4]",
    "[#1:1]-[#6X4]-[#7,#8,#9,#16,#17,#35]",
    "[#1:1]-[#7]",
    "[#1:1]-[#8]",
    "[#35:1]",
    "[#6:1]",
    "[#6X4:1]",
    "[#7:1]",
    "[#8:1]",
    "[#8X2H0+0:1]",
    "[#8X2H1+0:1]",
];

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Smirks(#[from] SmirksError),

    #[error("vdW parameter '{0}' has no SMIRKS pattern")]
    MissingSmirks(String),

    #[error("No vdW parameter matches pattern '{0}'")]
    ParameterNotFound(String),
}

/// What a preparation run did, for reporting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditSummary {
    /// `(id, smirks)` of every removed parameter, in removal order.
    pub removed: Vec<(String, String)>,
    /// Parameters appended from the replacement water model.
    pub merged_parameters: usize,
    /// Parameters marked as optimizable.
    pub annotated: usize,
}

/// Runs the full preparation over `forcefield`, merging in `water`.
pub fn prepare(
    forcefield: &mut ForceFieldDocument,
    water: &ForceFieldDocument,
) -> Result<EditSummary, EditError> {
    let mut summary = EditSummary::default();

    remove_stale_water_parameters(forcefield, &mut summary);

    forcefield.deregister(LIBRARY_CHARGES_SECTION)?;
    info!("Deregistered the {} handler", LIBRARY_CHARGES_SECTION);

    remove_charged_vdw_parameters(forcefield, &mut summary)?;
    summary.merged_parameters = merge_water_model(forcefield, water);
    summary.annotated = annotate_optimizable_parameters(forcefield)?;

    Ok(summary)
}

/// Drops every parameter, in any handler, whose id names the old water model.
fn remove_stale_water_parameters(forcefield: &mut ForceFieldDocument, summary: &mut EditSummary) {
    for section in forcefield.sections.iter_mut() {
        let SectionBody::Parameters(parameters) = &mut section.body else {
            continue;
        };
        parameters.retain(|parameter| {
            let stale = parameter
                .id()
                .is_some_and(|id| id.contains(STALE_WATER_ID_FRAGMENT));
            if stale {
                let id = parameter.id().unwrap_or_default().to_string();
                let pattern = parameter.smirks().unwrap_or_default().to_string();
                debug!("Removing {} with pattern {}", id, pattern);
                summary.removed.push((id, pattern));
            }
            !stale
        });
    }
}

/// Drops vdW parameters whose tagged atom carries a formal charge; those are
/// the ions the training set cannot constrain.
fn remove_charged_vdw_parameters(
    forcefield: &mut ForceFieldDocument,
    summary: &mut EditSummary,
) -> Result<(), EditError> {
    let section = forcefield
        .section_mut(VDW_SECTION)
        .ok_or_else(|| DocumentError::HandlerNotFound(VDW_SECTION.to_string()))?;
    let Some(parameters) = section.parameters_mut() else {
        return Ok(());
    };

    let mut charged = Vec::new();
    for (index, parameter) in parameters.iter().enumerate() {
        let pattern = parameter.smirks().ok_or_else(|| {
            EditError::MissingSmirks(parameter.id().unwrap_or("<unnamed>").to_string())
        })?;
        if smirks::mapped_atom_formal_charge(pattern, 1)? != 0 {
            charged.push(index);
        }
    }

    for index in charged.into_iter().rev() {
        let parameter = parameters.remove(index);
        let id = parameter.id().unwrap_or_default().to_string();
        let pattern = parameter.smirks().unwrap_or_default().to_string();
        debug!("Removing {} with pattern {}", id, pattern);
        summary.removed.push((id, pattern));
    }
    Ok(())
}

/// Appends the water model's parameters, handler by handler. Handlers the
/// target does not carry are appended whole, keeping the water model's own
/// library charges alive.
fn merge_water_model(forcefield: &mut ForceFieldDocument, water: &ForceFieldDocument) -> usize {
    let mut appended = 0;
    for water_section in &water.sections {
        let SectionBody::Parameters(water_parameters) = &water_section.body else {
            continue;
        };
        match forcefield.section_mut(&water_section.name) {
            Some(section) => {
                if let Some(parameters) = section.parameters_mut() {
                    appended += water_parameters.len();
                    parameters.extend(water_parameters.iter().cloned());
                }
            }
            None => {
                appended += water_parameters.len();
                forcefield.sections.push(water_section.clone());
            }
        }
    }
    debug!("Appended {} water-model parameters", appended);
    appended
}

/// Marks the fixed set of vdW patterns as optimizable.
fn annotate_optimizable_parameters(forcefield: &mut ForceFieldDocument) -> Result<usize, EditError> {
    let section = forcefield
        .section_mut(VDW_SECTION)
        .ok_or_else(|| DocumentError::HandlerNotFound(VDW_SECTION.to_string()))?;
    let Some(parameters) = section.parameters_mut() else {
        return Err(DocumentError::HandlerNotFound(VDW_SECTION.to_string()).into());
    };

    for pattern in PARAMETERS_TO_OPTIMIZE {
        let parameter = parameters
            .iter_mut()
            .find(|parameter| parameter.smirks() == Some(pattern))
            .ok_or_else(|| EditError::ParameterNotFound(pattern.to_string()))?;
        parameter.set_attr(PARAMETERIZE_ATTRIBUTE, PARAMETERIZE_TARGETS);
        debug!("Marked {} as optimizable", pattern);
    }
    Ok(PARAMETERS_TO_OPTIMIZE.len())
}
