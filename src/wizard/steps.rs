use std::sync::Arc;

use crate::wizard::catalog::catalog;
use crate::wizard::error::WizardError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub title: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub keyword: String,
    pub details: Vec<Detail>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: usize,
    pub title: String,
    pub goal: String,
    pub confirmation: String,
    pub sections: Vec<Section>,
}

/// Working copy of the review steps.
///
/// Each step is reference-counted separately. An edit copies only the step it
/// touches and hands back a new version, so untouched steps keep pointing at
/// the static catalog and no two steps ever share item storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepsData {
    steps: Vec<Arc<StepDefinition>>,
    version: u64,
}

impl Default for StepsData {
    fn default() -> Self {
        Self::from_catalog()
    }
}

impl StepsData {
    pub fn from_catalog() -> Self {
        StepsData {
            steps: catalog().to_vec(),
            version: 0,
        }
    }

    /// Step by its 1-based id.
    pub fn step(&self, id: usize) -> Option<&StepDefinition> {
        id.checked_sub(1)
            .and_then(|index| self.steps.get(index))
            .map(|step| step.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter().map(|step| step.as_ref())
    }

    /// Number of edits applied since this working copy left the catalog.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn item(
        &self,
        id: usize,
        section_index: usize,
        detail_index: usize,
        item_index: usize,
    ) -> Result<&Item, WizardError> {
        let step = self.step(id).ok_or(WizardError::Index {
            level: "step",
            parent: "wizard",
            index: id,
            len: self.steps.len(),
        })?;
        let section = step.sections.get(section_index).ok_or(WizardError::Index {
            level: "section",
            parent: "step",
            index: section_index,
            len: step.sections.len(),
        })?;
        let detail = section.details.get(detail_index).ok_or(WizardError::Index {
            level: "detail",
            parent: "section",
            index: detail_index,
            len: section.details.len(),
        })?;
        detail.items.get(item_index).ok_or(WizardError::Index {
            level: "item",
            parent: "detail",
            index: item_index,
            len: detail.items.len(),
        })
    }

    /// Returns a new version with one item replaced. The path is checked
    /// before anything is copied, so a bad index leaves no trace.
    pub fn with_item_value(
        &self,
        id: usize,
        section_index: usize,
        detail_index: usize,
        item_index: usize,
        value: impl Into<String>,
    ) -> Result<StepsData, WizardError> {
        self.item(id, section_index, detail_index, item_index)?;

        let mut next = self.clone();
        let step = Arc::make_mut(&mut next.steps[id - 1]);
        step.sections[section_index].details[detail_index].items[item_index].value = value.into();
        next.version = self.version + 1;
        Ok(next)
    }

    #[cfg(test)]
    pub fn shares_step_with(&self, other: &StepsData, id: usize) -> bool {
        Arc::ptr_eq(&self.steps[id - 1], &other.steps[id - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_copies_only_the_touched_step() {
        let original = StepsData::from_catalog();
        let edited = original.with_item_value(3, 0, 1, 2, "9.9/10").unwrap();

        assert_eq!(edited.item(3, 0, 1, 2).unwrap().value, "9.9/10");
        assert_eq!(original.item(3, 0, 1, 2).unwrap().value, "9.1/10 (Natural)");
        assert!(!edited.shares_step_with(&original, 3));
        for id in [1, 2, 4, 5, 6] {
            assert!(edited.shares_step_with(&original, id));
            assert_eq!(edited.step(id), original.step(id));
        }
        assert_eq!(edited.version(), 1);
    }

    #[test]
    fn repeated_edits_keep_the_catalog_pristine() {
        let first = StepsData::from_catalog()
            .with_item_value(1, 0, 0, 0, "1024x1024")
            .unwrap();
        let second = first.with_item_value(1, 0, 0, 1, "stripped").unwrap();

        assert_eq!(second.item(1, 0, 0, 0).unwrap().value, "1024x1024");
        assert_eq!(second.item(1, 0, 0, 1).unwrap().value, "stripped");
        assert_eq!(
            StepsData::from_catalog().item(1, 0, 0, 0).unwrap().value,
            "518x518 Complete"
        );
    }

    #[test]
    fn out_of_range_paths_fail_fast() {
        let data = StepsData::from_catalog();

        let err = data.with_item_value(2, 5, 0, 0, "x").unwrap_err();
        assert!(matches!(
            err,
            WizardError::Index {
                level: "section",
                len: 2,
                ..
            }
        ));

        let err = data.with_item_value(2, 0, 0, 3, "x").unwrap_err();
        assert!(matches!(err, WizardError::Index { level: "item", .. }));

        let err = data.with_item_value(7, 0, 0, 0, "x").unwrap_err();
        assert!(matches!(err, WizardError::Index { level: "step", .. }));
    }
}
