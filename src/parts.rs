//! Part registry: the fixed table mapping segmentation labels to the integer
//! identifiers stored in mask pixels.
//!
//! The table is compile-time data and never changes at runtime. Labels are
//! canonical English kebab-case; the Korean labels emitted by the annotation
//! tooling are accepted as aliases.

use std::fmt;

/// Identifier of a segmented region, i.e. the value of a mask pixel.
///
/// `PartId::UNKNOWN` (-1) is the sentinel returned for labels that are not in
/// the registry. It never occurs in a mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(i16);

impl PartId {
    pub const UNKNOWN: PartId = PartId(-1);
    pub const BACKGROUND: PartId = PartId(0);
    pub const SKIN: PartId = PartId(1);
    pub const LEFT_EYEBROW: PartId = PartId(2);
    pub const RIGHT_EYEBROW: PartId = PartId(3);
    pub const LEFT_EYE: PartId = PartId(4);
    pub const RIGHT_EYE: PartId = PartId(5);
    pub const LEFT_EAR: PartId = PartId(7);
    pub const RIGHT_EAR: PartId = PartId(8);
    pub const NOSE: PartId = PartId(10);
    pub const UPPER_LIP: PartId = PartId(12);
    pub const LOWER_LIP: PartId = PartId(13);
    pub const NECK: PartId = PartId(14);
    pub const HAIR: PartId = PartId(17);

    pub const fn new(raw: i16) -> Self {
        PartId(raw)
    }

    /// Part id carried by a mask pixel value.
    pub const fn from_mask_value(value: u8) -> Self {
        PartId(value as i16)
    }

    pub const fn value(self) -> i16 {
        self.0
    }

    /// Slot in a 256-entry lookup table, or `None` for ids a mask byte cannot hold.
    pub fn index(self) -> Option<usize> {
        u8::try_from(self.0).ok().map(usize::from)
    }

    pub fn is_unknown(self) -> bool {
        self == PartId::UNKNOWN
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// REGISTRY TABLE
// ============================================================================

/// (id, canonical label, Korean annotation label)
const PARTS: &[(PartId, &str, &str)] = &[
    (PartId::BACKGROUND, "background", "배경"),
    (PartId::SKIN, "skin", "피부"),
    (PartId::LEFT_EYEBROW, "left-eyebrow", "왼쪽눈썹"),
    (PartId::RIGHT_EYEBROW, "right-eyebrow", "오른쪽눈썹"),
    (PartId::LEFT_EYE, "left-eye", "왼쪽눈"),
    (PartId::RIGHT_EYE, "right-eye", "오른쪽눈"),
    (PartId::LEFT_EAR, "left-ear", "왼쪽귀"),
    (PartId::RIGHT_EAR, "right-ear", "오른쪽귀"),
    (PartId::NOSE, "nose", "코"),
    (PartId::UPPER_LIP, "upper-lip", "윗입술"),
    (PartId::LOWER_LIP, "lower-lip", "아랫입술"),
    (PartId::NECK, "neck", "목"),
    (PartId::HAIR, "hair", "머리카락"),
];

/// Resolve a label to its part id. Returns `PartId::UNKNOWN` for anything not
/// in the registry; callers must check for the sentinel.
///
/// Matching trims surrounding whitespace and ignores ASCII case. Underscores
/// and spaces are treated like hyphens (`"Left Eye"`, `"left_eye"`).
pub fn label_to_id(label: &str) -> PartId {
    let trimmed = label.trim();
    let normalized: String = trimmed
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    PARTS
        .iter()
        .find(|(_, canonical, alias)| *canonical == normalized || *alias == trimmed)
        .map(|(id, _, _)| *id)
        .unwrap_or(PartId::UNKNOWN)
}

/// Canonical label for display. `None` for ids without a registered label.
pub fn id_to_label(id: PartId) -> Option<&'static str> {
    PARTS
        .iter()
        .find(|(pid, _, _)| *pid == id)
        .map(|(_, canonical, _)| *canonical)
}

/// Every registered part, background included, in ascending id order.
pub fn all_parts() -> impl Iterator<Item = (PartId, &'static str)> {
    PARTS.iter().map(|(id, canonical, _)| (*id, *canonical))
}

/// Label for any id, falling back to the number for unregistered mask values.
pub fn display_name(id: PartId) -> String {
    match id_to_label(id) {
        Some(label) => label.to_string(),
        None => format!("part {}", id),
    }
}

// ============================================================================
// PART GROUPS — categories shown to the user, each expanding to its parts
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartGroup {
    Skin,
    Eyebrows,
    Eyes,
    Ears,
    Nose,
    Lips,
    Hair,
}

impl PartGroup {
    pub fn all() -> &'static [PartGroup] {
        &[
            PartGroup::Skin,
            PartGroup::Eyebrows,
            PartGroup::Eyes,
            PartGroup::Ears,
            PartGroup::Nose,
            PartGroup::Lips,
            PartGroup::Hair,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            PartGroup::Skin => "skin",
            PartGroup::Eyebrows => "eyebrows",
            PartGroup::Eyes => "eyes",
            PartGroup::Ears => "ears",
            PartGroup::Nose => "nose",
            PartGroup::Lips => "lips",
            PartGroup::Hair => "hair",
        }
    }

    pub fn parts(&self) -> &'static [PartId] {
        match self {
            PartGroup::Skin => &[PartId::SKIN],
            PartGroup::Eyebrows => &[PartId::LEFT_EYEBROW, PartId::RIGHT_EYEBROW],
            PartGroup::Eyes => &[PartId::LEFT_EYE, PartId::RIGHT_EYE],
            PartGroup::Ears => &[PartId::LEFT_EAR, PartId::RIGHT_EAR],
            PartGroup::Nose => &[PartId::NOSE],
            PartGroup::Lips => &[PartId::UPPER_LIP, PartId::LOWER_LIP],
            PartGroup::Hair => &[PartId::HAIR],
        }
    }

    pub fn from_label(label: &str) -> Option<PartGroup> {
        let label = label.trim().to_ascii_lowercase();
        PartGroup::all().iter().copied().find(|g| g.label() == label)
    }

    /// Group containing `id`, if any. Background and neck have none.
    pub fn of(id: PartId) -> Option<PartGroup> {
        PartGroup::all()
            .iter()
            .copied()
            .find(|g| g.parts().contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn known_labels_resolve() {
        assert_eq!(label_to_id("skin"), PartId::SKIN);
        assert_eq!(label_to_id("hair"), PartId::HAIR);
        assert_eq!(label_to_id("lower-lip").value(), 13);
        assert_eq!(label_to_id("background").value(), 0);
    }

    #[test]
    fn unknown_label_is_sentinel() {
        let id = label_to_id("tail");
        assert!(id.is_unknown());
        assert_eq!(id.value(), -1);
        assert_eq!(label_to_id(""), PartId::UNKNOWN);
    }

    #[test]
    fn lookup_is_lenient_about_case_and_separators() {
        assert_eq!(label_to_id("  Left Eye "), PartId::LEFT_EYE);
        assert_eq!(label_to_id("RIGHT_EYEBROW"), PartId::RIGHT_EYEBROW);
    }

    #[test]
    fn korean_aliases_resolve() {
        assert_eq!(label_to_id("피부"), PartId::SKIN);
        assert_eq!(label_to_id("오른쪽귀"), PartId::RIGHT_EAR);
        assert_eq!(label_to_id("배경"), PartId::BACKGROUND);
    }

    #[test]
    fn ids_and_labels_are_unique_and_invertible() {
        let ids: HashSet<_> = all_parts().map(|(id, _)| id).collect();
        let labels: HashSet<_> = all_parts().map(|(_, l)| l).collect();
        assert_eq!(ids.len(), PARTS.len());
        assert_eq!(labels.len(), PARTS.len());
        for (id, label) in all_parts() {
            assert_eq!(label_to_id(label), id);
            assert_eq!(id_to_label(id), Some(label));
        }
    }

    #[test]
    fn unregistered_ids_have_no_label() {
        assert_eq!(id_to_label(PartId::new(6)), None);
        assert_eq!(id_to_label(PartId::UNKNOWN), None);
        assert_eq!(display_name(PartId::new(18)), "part 18");
    }

    #[test]
    fn index_only_for_mask_range() {
        assert_eq!(PartId::SKIN.index(), Some(1));
        assert_eq!(PartId::from_mask_value(255).index(), Some(255));
        assert_eq!(PartId::UNKNOWN.index(), None);
        assert_eq!(PartId::new(300).index(), None);
    }

    #[test]
    fn groups_cover_labelled_face_parts() {
        assert_eq!(PartGroup::of(PartId::LOWER_LIP), Some(PartGroup::Lips));
        assert_eq!(PartGroup::of(PartId::NECK), None);
        assert_eq!(PartGroup::of(PartId::BACKGROUND), None);
        assert_eq!(PartGroup::from_label("Eyes"), Some(PartGroup::Eyes));
        let total: usize = PartGroup::all().iter().map(|g| g.parts().len()).sum();
        assert_eq!(total, 11);
    }
}
