//! # Technology
//!
//! Planes, tile types and the design rules plowing cares about, compiled
//! from a serde-loadable [`TechSpec`] into per-type-pair rule buckets.
//!
//! ## Rule buckets
//!
//! `width(l, r)` and `spacing(l, r)` hold the [`PlowRule`]s that apply to an
//! edge with `l` on its left and `r` on its right. A rule says: anything in
//! the area swept by the edge, plus `dist` beyond it, that is not one of
//! `oktypes` must be pushed along.
//!
//! ```text
//! width poly 2          ->  width[space][poly] = {ok: poly, dist: 2}
//! spacing poly poly 3   ->  spacing[poly][space] = {ok: ¬poly, dist: 3}
//! ```
//!
//! Only `width` and `spacing` rules are compiled; edge rules are ignored.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{TileType, TypeMask, MAX_TYPES};
use crate::{Error, Result};

/// Rules attached to one `(left, right)` type pair.
pub type RuleList = SmallVec<[PlowRule; 2]>;

/// Maximum number of planes a technology may declare.
pub const MAX_PLANES: usize = 32;

// ============================================================================
// Serialized description
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechSpec {
    pub planes: Vec<String>,
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub width: Vec<WidthSpec>,
    #[serde(default)]
    pub spacing: Vec<SpacingSpec>,
    #[serde(default)]
    pub fixed: Vec<String>,
    #[serde(default)]
    pub covered: Vec<String>,
    #[serde(default)]
    pub drag: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    pub plane: String,
    /// Extra planes a contact connects; non-empty makes the type a contact.
    #[serde(default)]
    pub contact: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidthSpec {
    pub layers: Vec<String>,
    pub distance: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjacency {
    TouchingOk,
    TouchingIllegal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingSpec {
    pub layers1: Vec<String>,
    pub layers2: Vec<String>,
    pub distance: i32,
    pub adjacency: Adjacency,
}

// ============================================================================
// Compiled rules
// ============================================================================

/// Set on width rules; spacing rules have it clear.
pub const PR_WIDTH: u8 = 0x01;

/// A width or spacing rule as seen from the moving edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlowRule {
    /// Material to the left of the penumbra outline.
    pub ltypes: TypeMask,
    /// Anything else within `dist` of the moving edge must move too.
    pub oktypes: TypeMask,
    pub dist: i32,
    /// Plane the rule is checked on.
    pub plane: usize,
    pub flags: u8,
}

impl PlowRule {
    pub fn is_width(&self) -> bool {
        self.flags & PR_WIDTH != 0
    }
}

/// A compiled technology.
#[derive(Debug, Clone)]
pub struct Technology {
    plane_names: Vec<String>,
    type_names: Vec<String>,
    type_planes: Vec<u32>,
    plane_types: Vec<TypeMask>,
    width: Vec<Vec<RuleList>>,
    spacing: Vec<Vec<RuleList>>,
    illegal: Vec<TypeMask>,
    max_dist: Vec<i32>,
    halo: i32,
    pub fixed: TypeMask,
    pub covered: TypeMask,
    pub drag: TypeMask,
    pub contacts: TypeMask,
    /// Left and right types of every non-empty width bucket.
    pub width_l: TypeMask,
    pub width_r: TypeMask,
    /// Left and right types of every non-empty spacing bucket.
    pub space_l: TypeMask,
    pub space_r: TypeMask,
}

impl Technology {
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: TechSpec = serde_json::from_str(json)?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &TechSpec) -> Result<Self> {
        if spec.planes.is_empty() {
            return Err(Error::TechError("technology declares no planes".into()));
        }
        if spec.planes.len() > MAX_PLANES {
            return Err(Error::TechError(format!(
                "too many planes ({}, limit {MAX_PLANES})",
                spec.planes.len()
            )));
        }
        // space, declared types, and the reserved cell type
        if spec.types.len() + 2 > MAX_TYPES {
            return Err(Error::TechError(format!(
                "too many types ({}, limit {})",
                spec.types.len(),
                MAX_TYPES - 2
            )));
        }

        let all_planes: u32 = if spec.planes.len() == 32 { u32::MAX } else { (1u32 << spec.planes.len()) - 1 };
        let mut tech = Technology {
            plane_names: spec.planes.clone(),
            type_names: vec!["space".to_string()],
            type_planes: vec![all_planes],
            plane_types: vec![TypeMask::space(); spec.planes.len()],
            width: Vec::new(),
            spacing: Vec::new(),
            illegal: Vec::new(),
            max_dist: Vec::new(),
            halo: 0,
            fixed: TypeMask::EMPTY,
            covered: TypeMask::EMPTY,
            drag: TypeMask::EMPTY,
            contacts: TypeMask::EMPTY,
            width_l: TypeMask::EMPTY,
            width_r: TypeMask::EMPTY,
            space_l: TypeMask::EMPTY,
            space_r: TypeMask::EMPTY,
        };

        for ts in &spec.types {
            if tech.type_names.iter().any(|n| n == &ts.name) {
                return Err(Error::TechError(format!("type \"{}\" declared twice", ts.name)));
            }
            let t = TileType(tech.type_names.len() as u16);
            let mut planes = 1u32 << tech.plane_index(&ts.plane)?;
            for p in &ts.contact {
                planes |= 1u32 << tech.plane_index(p)?;
            }
            if !ts.contact.is_empty() {
                tech.contacts.insert(t);
            }
            for p in 0..tech.plane_names.len() {
                if planes & (1 << p) != 0 {
                    tech.plane_types[p].insert(t);
                }
            }
            tech.type_names.push(ts.name.clone());
            tech.type_planes.push(planes);
        }

        let n = tech.type_names.len();
        tech.width = vec![vec![RuleList::new(); n]; n];
        tech.spacing = vec![vec![RuleList::new(); n]; n];
        tech.illegal = vec![TypeMask::EMPTY; n];

        for w in &spec.width {
            let set = tech.mask_of(&w.layers)?;
            tech.add_width_rule(set, w.distance);
        }
        for s in &spec.spacing {
            let set1 = tech.mask_of(&s.layers1)?;
            let set2 = tech.mask_of(&s.layers2)?;
            tech.add_spacing_rule(set1, set2, s.distance, s.adjacency);
        }

        tech.fixed = tech.mask_of(&spec.fixed)?;
        tech.covered = tech.mask_of(&spec.covered)?;
        tech.drag = tech.mask_of(&spec.drag)?;
        tech.fixed = tech.fixed.union(tech.contacts);

        tech.finish_rules();
        tracing::debug!(
            planes = tech.plane_names.len(),
            types = n,
            halo = tech.halo,
            "compiled technology"
        );
        Ok(tech)
    }

    // ========================================================================
    // Rule compilation
    // ========================================================================

    /// Planes shared by every type in `set`.
    fn coincident_planes(&self, set: TypeMask) -> u32 {
        let mut planes = u32::MAX;
        let mut any = false;
        for t in set.iter() {
            if t.is_space() || t.index() >= self.type_planes.len() {
                continue;
            }
            planes &= self.type_planes[t.index()];
            any = true;
        }
        if any { planes } else { 0 }
    }

    fn add_width_rule(&mut self, set: TypeMask, distance: i32) {
        let pmask = self.coincident_planes(set);
        if pmask == 0 {
            tracing::warn!(distance, "width rule layers share no plane; ignored");
            return;
        }
        let plane = pmask.trailing_zeros() as usize;
        let set_c = set.complement().intersect(self.plane_types[plane]);
        let n = self.type_names.len();
        for i in (0..n).map(|i| TileType(i as u16)).filter(|t| set_c.has(*t)) {
            for j in (0..n).map(|j| TileType(j as u16)) {
                if self.on_same_plane(i, j) && set.has(j) {
                    self.width[i.index()][j.index()].push(PlowRule {
                        ltypes: set_c,
                        oktypes: set,
                        dist: distance,
                        plane,
                        flags: PR_WIDTH,
                    });
                }
            }
        }
    }

    fn add_spacing_rule(&mut self, set1: TypeMask, set2: TypeMask, distance: i32, adjacency: Adjacency) {
        let mut planes1 = self.coincident_planes(set1);
        let mut planes2 = self.coincident_planes(set2);
        if planes1 == 0 || planes2 == 0 {
            tracing::warn!(distance, "spacing rule layers share no plane; ignored");
            return;
        }

        let (set_r, set_r_reverse) = match adjacency {
            Adjacency::TouchingOk => {
                if planes1 != planes2 {
                    tracing::warn!(distance, "touching_ok spacing across planes; ignored");
                    return;
                }
                let lowest = 1u32 << planes1.trailing_zeros();
                planes1 = lowest;
                planes2 = lowest;
                let r = set1.complement().intersect(set2.complement());
                (r, r)
            }
            Adjacency::TouchingIllegal => {
                for a in set1.iter() {
                    if a.index() < self.illegal.len() {
                        let bad = set2.minus(set1);
                        self.illegal[a.index()] = self.illegal[a.index()].union(bad);
                    }
                }
                if set1 != set2 {
                    for b in set2.iter() {
                        if b.index() < self.illegal.len() {
                            let bad = set1.minus(set2);
                            self.illegal[b.index()] = self.illegal[b.index()].union(bad);
                        }
                    }
                }
                (set1.complement(), set2.complement())
            }
        };

        let n = self.type_names.len();
        let nplanes = self.plane_names.len();
        for i in (0..n).map(|i| TileType(i as u16)) {
            for j in (0..n).map(|j| TileType(j as u16)) {
                if i == j || !self.on_same_plane(i, j) {
                    continue;
                }
                if set1.has(i) && set_r.has(j) {
                    for p in (0..nplanes).filter(|p| planes2 & (1 << p) != 0) {
                        let rule = PlowRule {
                            ltypes: self.plane_types[p].intersect(set_r_reverse.complement()),
                            oktypes: self.plane_types[p].minus(set2),
                            dist: distance,
                            plane: p,
                            flags: 0,
                        };
                        self.spacing[i.index()][j.index()].push(rule);
                    }
                }
                if set1 == set2 {
                    continue;
                }
                if set2.has(i) && set_r_reverse.has(j) {
                    for p in (0..nplanes).filter(|p| planes1 & (1 << p) != 0) {
                        let rule = PlowRule {
                            ltypes: self.plane_types[p].intersect(set_r_reverse.complement()),
                            oktypes: self.plane_types[p].minus(set1),
                            dist: distance,
                            plane: p,
                            flags: 0,
                        };
                        self.spacing[i.index()][j.index()].push(rule);
                    }
                }
            }
        }
    }

    /// Drop covered rules, derive per-type maximum distances, the halo and
    /// the rule-table masks.
    fn finish_rules(&mut self) {
        let n = self.type_names.len();
        self.max_dist = vec![0; n];
        for i in 0..n {
            for j in 0..n {
                optimize(&mut self.width[i][j]);
                optimize(&mut self.spacing[i][j]);
                let (l, r) = (TileType(i as u16), TileType(j as u16));
                if !self.width[i][j].is_empty() {
                    self.width_l.insert(l);
                    self.width_r.insert(r);
                }
                if !self.spacing[i][j].is_empty() {
                    self.space_l.insert(l);
                    self.space_r.insert(r);
                }
                for pr in self.width[i][j].iter().chain(self.spacing[i][j].iter()) {
                    self.max_dist[i] = self.max_dist[i].max(pr.dist);
                }
            }
        }
        self.halo = self.max_dist.iter().copied().max().unwrap_or(0);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn plane_count(&self) -> usize {
        self.plane_names.len()
    }

    pub fn type_count(&self) -> usize {
        self.type_names.len()
    }

    pub fn plane_index(&self, name: &str) -> Result<usize> {
        self.plane_names
            .iter()
            .position(|p| p == name)
            .ok_or_else(|| Error::NotFound(format!("plane \"{name}\"")))
    }

    pub fn plane_name(&self, plane: usize) -> &str {
        self.plane_names.get(plane).map(String::as_str).unwrap_or("?")
    }

    pub fn type_named(&self, name: &str) -> Result<TileType> {
        self.type_names
            .iter()
            .position(|t| t == name)
            .map(|i| TileType(i as u16))
            .ok_or_else(|| Error::NotFound(format!("type \"{name}\"")))
    }

    pub fn type_name(&self, t: TileType) -> &str {
        if t == TileType::CELL {
            return "cell";
        }
        self.type_names.get(t.index()).map(String::as_str).unwrap_or("?")
    }

    /// Mask of the named types; `*` stands for every non-space type.
    pub fn mask_of<S: AsRef<str>>(&self, names: &[S]) -> Result<TypeMask> {
        let mut mask = TypeMask::EMPTY;
        for name in names {
            let name = name.as_ref().trim();
            if name == "*" {
                mask = mask.union(self.all_types().without(TileType::SPACE));
            } else if !name.is_empty() {
                mask.insert(self.type_named(name)?);
            }
        }
        Ok(mask)
    }

    /// Parse a comma-separated layer list such as `poly,metal1`.
    pub fn parse_layers(&self, list: &str) -> Result<TypeMask> {
        let names: Vec<&str> = list.split(',').collect();
        self.mask_of(&names)
    }

    /// Every declared type, space included.
    pub fn all_types(&self) -> TypeMask {
        (0..self.type_names.len()).map(|i| TileType(i as u16)).collect()
    }

    pub fn plane_types(&self, plane: usize) -> TypeMask {
        self.plane_types.get(plane).copied().unwrap_or(TypeMask::EMPTY)
    }

    /// Planes the type lives on, lowest first.
    pub fn planes_of(&self, t: TileType) -> impl Iterator<Item = usize> + '_ {
        let bits = self.type_planes.get(t.index()).copied().unwrap_or(0);
        (0..self.plane_names.len()).filter(move |p| bits & (1 << p) != 0)
    }

    pub fn on_same_plane(&self, a: TileType, b: TileType) -> bool {
        match (self.type_planes.get(a.index()), self.type_planes.get(b.index())) {
            (Some(pa), Some(pb)) => pa & pb != 0,
            _ => false,
        }
    }

    pub fn width_rules(&self, l: TileType, r: TileType) -> &[PlowRule] {
        bucket(&self.width, l, r)
    }

    pub fn spacing_rules(&self, l: TileType, r: TileType) -> &[PlowRule] {
        bucket(&self.spacing, l, r)
    }

    /// True when `r` may not touch `l` directly (a `touching_illegal` pair).
    pub fn is_illegal(&self, l: TileType, r: TileType) -> bool {
        self.illegal.get(l.index()).is_some_and(|m| m.has(r))
    }

    /// Largest rule distance with `t` on the left.
    pub fn max_dist(&self, t: TileType) -> i32 {
        self.max_dist.get(t.index()).copied().unwrap_or(0)
    }

    /// Largest rule distance overall.
    pub fn halo(&self) -> i32 {
        self.halo
    }
}

fn bucket(table: &[Vec<RuleList>], l: TileType, r: TileType) -> &[PlowRule] {
    table
        .get(l.index())
        .and_then(|row| row.get(r.index()))
        .map(|list| list.as_slice())
        .unwrap_or(&[])
}

/// Remove every rule covered by another rule in the same bucket: one with at
/// least the same distance, same flags, plane and ltypes, and oktypes that are
/// a subset of the candidate's.
fn optimize(rules: &mut RuleList) {
    let mut cand = 0;
    while cand < rules.len() {
        let c = rules[cand];
        let covered = rules.iter().enumerate().any(|(k, pr)| {
            k != cand
                && pr.dist >= c.dist
                && pr.flags == c.flags
                && pr.plane == c.plane
                && pr.ltypes == c.ltypes
                && pr.oktypes.intersect(c.oktypes) == pr.oktypes
        });
        if covered {
            rules.remove(cand);
        } else {
            cand += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_json() -> &'static str {
        r#"{
            "planes": ["active", "metal"],
            "types": [
                {"name": "poly", "plane": "active"},
                {"name": "diff", "plane": "active"},
                {"name": "metal", "plane": "metal"},
                {"name": "pcontact", "plane": "active", "contact": ["metal"]}
            ],
            "width": [
                {"layers": ["poly"], "distance": 2},
                {"layers": ["metal", "pcontact"], "distance": 3}
            ],
            "spacing": [
                {"layers1": ["poly"], "layers2": ["poly"], "distance": 2, "adjacency": "touching_ok"},
                {"layers1": ["poly"], "layers2": ["diff"], "distance": 1, "adjacency": "touching_illegal"}
            ],
            "covered": ["diff"]
        }"#
    }

    #[test]
    fn test_width_rule_buckets() {
        let tech = Technology::from_json(sample_json()).unwrap();
        let space = TileType::SPACE;
        let poly = tech.type_named("poly").unwrap();
        let rules = tech.width_rules(space, poly);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].dist, 2);
        assert_eq!(rules[0].oktypes, TypeMask::only(poly));
        assert!(rules[0].is_width());
        assert!(tech.width_rules(poly, space).is_empty());
    }

    #[test]
    fn test_touching_ok_spacing_is_one_directional_for_same_set() {
        let tech = Technology::from_json(sample_json()).unwrap();
        let poly = tech.type_named("poly").unwrap();
        let rules = tech.spacing_rules(poly, TileType::SPACE);
        assert!(rules.iter().any(|r| r.dist == 2 && !r.oktypes.has(poly)));
        assert!(tech.spacing_rules(TileType::SPACE, poly).is_empty());
    }

    #[test]
    fn test_touching_illegal_marks_adjacency() {
        let tech = Technology::from_json(sample_json()).unwrap();
        let poly = tech.type_named("poly").unwrap();
        let diff = tech.type_named("diff").unwrap();
        assert!(tech.is_illegal(poly, diff));
        assert!(tech.is_illegal(diff, poly));
        assert!(!tech.is_illegal(poly, TileType::SPACE));
    }

    #[test]
    fn test_contacts_are_fixed_and_span_planes() {
        let tech = Technology::from_json(sample_json()).unwrap();
        let pc = tech.type_named("pcontact").unwrap();
        assert!(tech.contacts.has(pc));
        assert!(tech.fixed.has(pc));
        assert_eq!(tech.planes_of(pc).collect::<Vec<_>>(), vec![0, 1]);
        assert!(tech.on_same_plane(pc, tech.type_named("metal").unwrap()));
    }

    #[test]
    fn test_halo_and_max_dist() {
        let tech = Technology::from_json(sample_json()).unwrap();
        assert_eq!(tech.halo(), 3);
        assert_eq!(tech.max_dist(tech.type_named("poly").unwrap()), 2);
    }

    #[test]
    fn test_optimize_drops_covered_rule() {
        let a = TypeMask(0b110);
        let mut rules: RuleList = smallvec::smallvec![
            PlowRule { ltypes: a, oktypes: TypeMask(0b110), dist: 2, plane: 0, flags: 0 },
            PlowRule { ltypes: a, oktypes: TypeMask(0b010), dist: 3, plane: 0, flags: 0 },
        ];
        optimize(&mut rules);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].dist, 3);
    }

    #[test]
    fn test_unknown_layer_is_not_found() {
        let tech = Technology::from_json(sample_json()).unwrap();
        assert!(matches!(tech.parse_layers("poly,bogus"), Err(Error::NotFound(_))));
        let m = tech.parse_layers("poly,metal").unwrap();
        assert!(m.has(tech.type_named("metal").unwrap()));
    }
}
