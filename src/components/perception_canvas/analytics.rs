//! Summary counts over the content nodes of a map.

use std::collections::HashMap;

use super::types::{AgencyOrientation, ContentNode, DomainId, Lens, LensId, Node, PatternType};

/// How many meta tags [`MapSummary::top_meta_tags`] keeps.
pub const TOP_META_TAGS: usize = 5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapSummary {
	pub content_nodes: usize,
	pub per_domain: Vec<(DomainId, usize)>,
	/// One entry per catalog lens, in catalog order.
	pub per_lens: Vec<(LensId, usize)>,
	pub per_pattern_type: Vec<(PatternType, usize)>,
	pub per_agency: Vec<(AgencyOrientation, usize)>,
	/// Most used tags first; ties are broken alphabetically.
	pub top_meta_tags: Vec<(String, usize)>,
}

pub fn summarize(nodes: &[Node], lenses: &[Lens]) -> MapSummary {
	let content: Vec<&ContentNode> = nodes.iter().filter_map(Node::as_content).collect();
	let count = |pred: &dyn Fn(&ContentNode) -> bool| content.iter().filter(|&&n| pred(n)).count();

	let per_domain = DomainId::ALL
		.iter()
		.map(|&d| (d, count(&|n: &ContentNode| n.data.domain_ids.contains(&d))))
		.collect();
	let per_lens = lenses
		.iter()
		.map(|lens| (lens.id.clone(), count(&|n: &ContentNode| n.data.lens_ids.contains(&lens.id))))
		.collect();
	let per_pattern_type = PatternType::ALL
		.iter()
		.map(|&p| (p, count(&|n: &ContentNode| n.data.pattern_type == Some(p))))
		.collect();
	let per_agency = AgencyOrientation::ALL
		.iter()
		.map(|&a| (a, count(&|n: &ContentNode| n.data.agency_orientation == Some(a))))
		.collect();

	let mut tags: HashMap<&str, usize> = HashMap::new();
	for node in &content {
		for tag in &node.data.meta_tags {
			*tags.entry(tag.as_str()).or_insert(0) += 1;
		}
	}
	let mut top_meta_tags: Vec<(String, usize)> =
		tags.into_iter().map(|(t, c)| (t.to_string(), c)).collect();
	top_meta_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
	top_meta_tags.truncate(TOP_META_TAGS);

	MapSummary {
		content_nodes: content.len(),
		per_domain,
		per_lens,
		per_pattern_type,
		per_agency,
		top_meta_tags,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::seed;
	use pretty_assertions::assert_eq;

	#[test]
	fn seed_map_summary() {
		let summary = summarize(&seed::seed_nodes(), &seed::default_lenses());
		assert_eq!(summary.content_nodes, 3);
		assert_eq!(
			summary.per_domain,
			vec![
				(DomainId::Private, 2),
				(DomainId::Public, 2),
				(DomainId::Abstract, 1),
			]
		);
		let empathy = summary.per_lens.iter().find(|(id, _)| id == "empathy");
		assert_eq!(empathy, Some(&("empathy".to_string(), 2)));
		assert_eq!(summary.per_lens.len(), 7);
		assert_eq!(
			summary.top_meta_tags,
			vec![("Control loop".to_string(), 3), ("Over-analysis".to_string(), 2)]
		);
		let loops = summary
			.per_pattern_type
			.iter()
			.find(|(p, _)| *p == PatternType::Loop);
		assert_eq!(loops, Some(&(PatternType::Loop, 1)));
	}

	#[test]
	fn empty_map_has_zero_counts() {
		let summary = summarize(&[], &[]);
		assert_eq!(summary.content_nodes, 0);
		assert!(summary.per_domain.iter().all(|(_, c)| *c == 0));
		assert!(summary.top_meta_tags.is_empty());
	}
}
