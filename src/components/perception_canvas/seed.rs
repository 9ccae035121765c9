//! Starter content for an empty store, plus the built-in meta-pattern library.

use std::collections::BTreeSet;

use chrono::Utc;

use super::geometry::Point;
use super::types::{
	AgencyOrientation, ConnectionType, ContentData, ContentNode, DomainData, DomainId, DomainNode,
	Edge, Lens, Mode, Node, PatternType,
};

/// Diameter of the seeded domain circles.
pub const SEED_DOMAIN_DIAMETER: f64 = 600.0;

fn domain_node(domain: DomainId, x: f64, y: f64) -> Node {
	Node::Domain(DomainNode {
		id: format!("d-{}", domain.as_str()),
		position: Point::new(x, y),
		width: SEED_DOMAIN_DIAMETER,
		height: Some(SEED_DOMAIN_DIAMETER),
		data: DomainData {
			label: domain.label().to_string(),
			domain_id: domain,
		},
	})
}

fn tags<const N: usize>(values: [&str; N]) -> BTreeSet<String> {
	values.into_iter().map(str::to_string).collect()
}

/// The three overlapping domain circles and three example reflections.
pub fn seed_nodes() -> Vec<Node> {
	let now = Utc::now();
	vec![
		domain_node(DomainId::Private, -200.0, -200.0),
		domain_node(DomainId::Public, 500.0, -200.0),
		domain_node(DomainId::Abstract, 150.0, 300.0),
		Node::Content(ContentNode {
			id: "n-1".into(),
			position: Point::new(420.0, 340.0),
			data: ContentData {
				title: "Argument with Sam".into(),
				perceived_pattern: "Had a disagreement about project priorities".into(),
				interpretation: "Felt unheard and frustrated - maybe I'm not valued on the team".into(),
				active_questions: "Why does this keep happening? Am I communicating poorly?".into(),
				felt_sense: "Tightness in chest, heat rising".into(),
				before_state: "Felt confident about my ideas".into(),
				after_state: "Doubting my place on the team".into(),
				notes: "Need to follow up tomorrow".into(),
				domain_ids: BTreeSet::from([DomainId::Private, DomainId::Public]),
				lens_ids: tags(["empathy"]),
				mode: Some(Mode::SocialFirst),
				pattern_type: Some(PatternType::Conflict),
				agency_orientation: Some(AgencyOrientation::Protective),
				agency_intensity: 7,
				refines_node_id: None,
				meta_tags: tags(["Control loop", "Over-analysis"]),
				created_at: now,
			},
		}),
		Node::Content(ContentNode {
			id: "n-2".into(),
			position: Point::new(650.0, 320.0),
			data: ContentData {
				title: "Manager expectations".into(),
				perceived_pattern: "Unclear deliverables for Q4".into(),
				interpretation: "Management is disorganized or intentionally vague".into(),
				active_questions: "What are they actually expecting from me?".into(),
				felt_sense: "Fog, confusion, slight anxiety".into(),
				domain_ids: BTreeSet::from([DomainId::Public]),
				lens_ids: tags(["systems"]),
				mode: Some(Mode::ConceptFirst),
				pattern_type: Some(PatternType::Trigger),
				agency_orientation: Some(AgencyOrientation::Curious),
				agency_intensity: 5,
				meta_tags: tags(["Control loop"]),
				created_at: now,
				..Default::default()
			},
		}),
		Node::Content(ContentNode {
			id: "n-3".into(),
			position: Point::new(480.0, 580.0),
			data: ContentData {
				title: "Late-night rumination".into(),
				perceived_pattern: "Replaying the day's interactions in my mind".into(),
				interpretation: "I'm trying to control what I can't control".into(),
				active_questions: "Why do I always worry about things I can't control?".into(),
				felt_sense: "Spinning thoughts, restless energy".into(),
				before_state: "Relaxed evening".into(),
				after_state: "Unable to settle".into(),
				domain_ids: BTreeSet::from([DomainId::Abstract, DomainId::Private]),
				lens_ids: tags(["aesthetic", "empathy"]),
				mode: Some(Mode::NarrativeFirst),
				pattern_type: Some(PatternType::Loop),
				agency_orientation: Some(AgencyOrientation::Reactive),
				agency_intensity: 8,
				meta_tags: tags(["Over-analysis", "Control loop"]),
				created_at: now,
				..Default::default()
			},
		}),
	]
}

fn edge(id: &str, source: &str, target: &str, label: &str, connection_type: ConnectionType) -> Edge {
	Edge {
		id: id.into(),
		source: source.into(),
		target: target.into(),
		label: label.into(),
		connection_type,
		explanation: None,
		meta_pattern_id: None,
	}
}

pub fn seed_edges() -> Vec<Edge> {
	vec![
		edge("e1", "n-1", "n-2", "Influences", ConnectionType::Influences),
		edge("e2", "n-2", "n-3", "Triggers", ConnectionType::Influences),
		edge("e3", "n-1", "n-3", "Mirrors", ConnectionType::Mirrors),
	]
}

fn lens(id: &str, name: &str, color: &str, questions: [&str; 2]) -> Lens {
	Lens {
		id: id.into(),
		name: name.into(),
		color: color.into(),
		questions: questions.into_iter().map(str::to_string).collect(),
	}
}

/// The catalog a new map starts with.
pub fn default_lenses() -> Vec<Lens> {
	vec![
		lens(
			"psychological",
			"Psychological",
			"#EC4899",
			[
				"What inner drives, fears, or wounds might be active here?",
				"What ego patterns or habits am I noticing in myself?",
			],
		),
		lens(
			"somatic",
			"Somatic",
			"#F59E0B",
			[
				"What is my body telling me through sensations or tension?",
				"Where do I feel this physically, and what energy is present?",
			],
		),
		lens(
			"aesthetic",
			"Aesthetic",
			"#8B5CF6",
			[
				"What is the felt quality, vibe, or texture of this moment?",
				"What beauty or symbolic meaning do I perceive here?",
			],
		),
		lens(
			"empathy",
			"Empathy",
			"#10B981",
			[
				"How might this feel from someone else's inner world?",
				"What might they be needing or experiencing right now?",
			],
		),
		lens(
			"systems",
			"Systems",
			"#3B82F6",
			[
				"What structures, incentives, or constraints shape this situation?",
				"How do the parts of this system influence each other?",
			],
		),
		lens(
			"existential",
			"Existential",
			"#6366F1",
			[
				"What does this mean in the context of mortality and freedom?",
				"Why does this matter, or what makes it significant?",
			],
		),
		lens(
			"mythic",
			"Mythic",
			"#EF4444",
			[
				"What archetypal pattern or story is playing out here?",
				"What role am I embodying (Hero, Shadow, Creator, Outsider)?",
			],
		),
	]
}

/// Diagnostic ↔ strength pairs, grouped by loop family.
pub const META_PATTERN_LIBRARY: &[(&str, &[(&str, &str)])] = &[
	(
		"internal",
		&[
			("Over-analysis", "Sense-making drive"),
			("Rumination spiral", "Deep rehearsal tendency"),
			("Self-abandonment", "Other-attunement"),
			("Harsh inner critic", "High standards holder"),
			("Perfectionistic tightening", "Quality calibration"),
			("Collapse response", "Energy conservation"),
			("Freeze–dissociation arc", "Protective distancing"),
			("Identity fusion", "Deep commitment"),
			("Hypervigilant scanning", "Environmental awareness"),
		],
	),
	(
		"relational",
		&[
			("Belonging loop", "Relational calibration"),
			("Approval seeking", "Connection-building"),
			("Conflict avoidance", "Harmony preservation"),
			("Pursuer–withdrawer", "Activation-approach dynamics"),
			("Control loop", "Reliability-seeking"),
			("Projection loop", "Pattern recognition"),
			("Deference pattern", "Respectful yielding"),
			("Role-locking", "Consistency provision"),
			("Persona conflict", "Identity flexibility"),
		],
	),
	(
		"meaningMaking",
		&[
			("Narrative inflation", "Meaning-making depth"),
			("Grand pattern projection", "Systems thinking"),
			("Hyper-interpretation", "Nuance sensitivity"),
			("Epistemic spiraling", "Intellectual rigor"),
			("Intuition override", "Rational calibration"),
			("Story reification", "Narrative coherence"),
		],
	),
	(
		"temporal",
		&[
			("Old-script reactivation", "Memory integration"),
			("Repetition compulsion", "Pattern completion drive"),
			("Inner child protector conflict", "Parts awareness"),
			("Later insight reframing", "Growth recognition"),
			("Scene re-entry loop", "Processing persistence"),
		],
	),
];

/// Which side of a library pair a tag names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
	Diagnostic,
	Strength,
	Neutral,
}

/// Framing of a meta tag together with its counterpart, if it is a library tag.
pub fn meta_tag_framing(tag: &str) -> (Framing, Option<&'static str>) {
	META_PATTERN_LIBRARY
		.iter()
		.flat_map(|(_, pairs)| pairs.iter())
		.find_map(|&(diagnostic, strength)| {
			if diagnostic == tag {
				Some((Framing::Diagnostic, Some(strength)))
			} else if strength == tag {
				Some((Framing::Strength, Some(diagnostic)))
			} else {
				None
			}
		})
		.unwrap_or((Framing::Neutral, None))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn seed_edges_only_reference_seed_nodes() {
		let nodes = seed_nodes();
		for edge in seed_edges() {
			assert!(nodes.iter().any(|n| n.id() == edge.source));
			assert!(nodes.iter().any(|n| n.id() == edge.target));
		}
	}

	#[test]
	fn framing_reports_the_other_side() {
		assert_eq!(
			meta_tag_framing("Control loop"),
			(Framing::Diagnostic, Some("Reliability-seeking"))
		);
		assert_eq!(
			meta_tag_framing("Systems thinking"),
			(Framing::Strength, Some("Grand pattern projection"))
		);
		assert_eq!(meta_tag_framing("my own tag"), (Framing::Neutral, None));
	}
}
