//! Partitioning is a pure function of the request and the limits

use contentgen::partition::{ContentKind, GenerationRequest, PartitionLimits, Partitioner};

fn source(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|n| {
            format!(
                "Paragraph {} explains how enzymes lower activation energy and why \
                 temperature and pH shift their rate of reaction in living cells.",
                n
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn limits() -> PartitionLimits {
    PartitionLimits {
        max_units: 8,
        max_items: 50,
        items_per_unit: 3,
        fragment_chars: 300,
        min_fragment_chars: 80,
    }
}

#[test]
fn test_partition_is_deterministic() {
    let partitioner = Partitioner::new(limits());
    let request = GenerationRequest::topic(ContentKind::Quiz, "Enzymes", 7)
        .with_source_text(source(6));

    let first = partitioner.partition(&request).unwrap();
    let second = partitioner.partition(&request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_units_are_contiguous_and_cover_the_count() {
    let partitioner = Partitioner::new(limits());
    for count in 1..=24 {
        let request = GenerationRequest::topic(ContentKind::Flashcards, "Optics", count);
        let units = partitioner.partition(&request).unwrap();

        let indices: Vec<_> = units.iter().map(|u| u.unit_index).collect();
        assert_eq!(indices, (0..units.len()).collect::<Vec<_>>());
        assert_eq!(units.iter().map(|u| u.input.item_count).sum::<usize>(), count);
        assert!(units.iter().all(|u| u.input.item_count >= 1));
    }
}

#[test]
fn test_source_fragments_preserve_text_order() {
    let partitioner = Partitioner::new(limits());
    let text = source(6);
    let request = GenerationRequest::topic(ContentKind::Quiz, "Enzymes", 6).with_source_text(&text);

    let units = partitioner.partition(&request).unwrap();
    assert!(units.len() > 1);

    let rejoined = units
        .iter()
        .map(|u| u.input.fragment.clone().unwrap())
        .collect::<Vec<_>>()
        .join(" ");
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(rejoined, normalized);
    assert_eq!(units.iter().map(|u| u.input.item_count).sum::<usize>(), 6);
}

#[test]
fn test_short_source_is_one_unit() {
    let partitioner = Partitioner::new(limits());
    let request = GenerationRequest::topic(ContentKind::Flashcards, "Cells", 2)
        .with_source_text("Cells are the basic unit of life.");

    let units = partitioner.partition(&request).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].input.subtopic, "Cells");
    assert_eq!(units[0].input.item_count, 2);
}
