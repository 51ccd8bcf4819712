use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{Classification, FileRecord};

pub struct ClassificationRule {
    pub name: &'static str,
    pub matches: fn(&FileRecord) -> bool,
    pub classification: Classification,
}

pub static RULES: [ClassificationRule; 4] = [
    ClassificationRule {
        name: "protocol-ref",
        matches: protocol_ref_matches,
        classification: Classification::Processed,
    },
    ClassificationRule {
        name: "category",
        matches: category_matches,
        classification: Classification::Processed,
    },
    ClassificationRule {
        name: "filename",
        matches: filename_matches,
        classification: Classification::Processed,
    },
    ClassificationRule {
        name: "data-type",
        matches: data_type_matches,
        classification: Classification::Processed,
    },
];

const PROCESSED_FILENAME_TOKENS: [&str; 5] = [
    r"(?:unnormalized|normalized|differential)[^/]*counts",
    r"differential_expression",
    r"(?:vst|rsem|star)_[^/]*counts",
    r"contrasts",
    r"sampletable",
];

const PROCESSED_DATA_TYPES: [&str; 5] = [
    "unnormalized counts",
    "normalized counts",
    "differential expression",
    "sample table",
    "differential expression contrasts",
];

static PROTOCOL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)genelab\b.*\bdata processing protocol").expect("protocol pattern")
});

static CATEGORY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)genelab processed\b.*\bfiles").expect("category pattern"));

static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let tokens = PROCESSED_FILENAME_TOKENS.join("|");
    Regex::new(&format!(r"(?i)^GLDS-\d+_(?:.*_)?(?:{tokens})")).expect("filename pattern")
});

fn protocol_ref_matches(record: &FileRecord) -> bool {
    record
        .protocol_refs
        .iter()
        .any(|protocol| PROTOCOL_PATTERN.is_match(protocol))
}

fn category_matches(record: &FileRecord) -> bool {
    CATEGORY_PATTERN.is_match(&record.category)
}

fn filename_matches(record: &FileRecord) -> bool {
    FILENAME_PATTERN.is_match(&record.filename)
}

fn data_type_matches(record: &FileRecord) -> bool {
    let data_type = record.data_type.trim();
    PROCESSED_DATA_TYPES
        .iter()
        .any(|label| data_type.eq_ignore_ascii_case(label))
}

pub fn matching_rule(record: &FileRecord) -> Option<&'static ClassificationRule> {
    RULES.iter().find(|rule| (rule.matches)(record))
}

pub fn evaluate(record: &FileRecord) -> Classification {
    matching_rule(record)
        .map(|rule| rule.classification)
        .unwrap_or(Classification::Raw)
}

pub fn classify(record: &mut FileRecord) -> Classification {
    if let Some(existing) = record.classification() {
        return existing;
    }
    let rule = matching_rule(record);
    let classification = rule
        .map(|rule| rule.classification)
        .unwrap_or(Classification::Raw);
    debug!(
        file = %record.filename,
        rule = rule.map(|rule| rule.name).unwrap_or("default"),
        %classification,
        "classified"
    );
    record.attach_classification(classification)
}

pub fn classify_all(records: &mut [FileRecord]) {
    for record in records.iter_mut() {
        classify(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str) -> FileRecord {
        FileRecord::new(filename, "OSD-101".parse().unwrap())
    }

    fn rule_name(record: &FileRecord) -> Option<&'static str> {
        matching_rule(record).map(|rule| rule.name)
    }

    #[test]
    fn rule_order_is_fixed() {
        let names: Vec<_> = RULES.iter().map(|rule| rule.name).collect();
        assert_eq!(names, vec!["protocol-ref", "category", "filename", "data-type"]);
    }

    #[test]
    fn protocol_rule() {
        let mut rec = record("reads.fastq.gz");
        rec.protocol_refs
            .insert("GeneLab RNAseq data processing protocol".to_string());
        assert_eq!(rule_name(&rec), Some("protocol-ref"));

        let mut other = record("reads.fastq.gz");
        other.protocol_refs.insert("data processing protocol".to_string());
        assert_eq!(rule_name(&other), None);
    }

    #[test]
    fn category_rule() {
        let mut rec = record("anything.bin");
        rec.category = "genelab processed microarray files".to_string();
        assert_eq!(rule_name(&rec), Some("category"));

        rec.category = "Raw Sequence Files".to_string();
        assert_eq!(rule_name(&rec), None);
    }

    #[test]
    fn filename_rule() {
        for name in [
            "GLDS-101_rna_seq_Unnormalized_Counts.csv",
            "GLDS-101_rna_seq_Normalized_Counts.csv",
            "GLDS-101_rna_seq_differential_expression.csv",
            "GLDS-101_rna_seq_VST_Counts.csv",
            "GLDS-101_rna_seq_RSEM_Unnormalized_Counts.csv",
            "GLDS-101_rna_seq_SampleTable.csv",
            "GLDS-101_rna_seq_contrasts.csv",
            "GLDS-7_Normalized_Counts.csv",
        ] {
            assert_eq!(rule_name(&record(name)), Some("filename"), "{name}");
        }
        for name in [
            "Mmus_C57-6J_LVR_FLT_Rep1_R1_raw.fastq.gz",
            "GLDS-101_metadata_OSD-101-ISA.zip",
            "notGLDS-101_rna_seq_Normalized_Counts.csv",
        ] {
            assert_eq!(rule_name(&record(name)), None, "{name}");
        }
    }

    #[test]
    fn data_type_rule_is_exact_label() {
        let mut rec = record("table.txt");
        rec.data_type = " Sample Table ".to_string();
        assert_eq!(rule_name(&rec), Some("data-type"));

        rec.data_type = "raw sample table dump".to_string();
        assert_eq!(rule_name(&rec), None);
    }

    #[test]
    fn protocol_wins_over_raw_looking_signals() {
        let mut rec = record("Sample1_R1_raw.fastq.gz");
        rec.category = "Raw Sequence Files".to_string();
        rec.data_type = "raw reads".to_string();
        rec.protocol_refs
            .insert("GeneLab RNAseq Data Processing Protocol".to_string());
        assert_eq!(evaluate(&rec), Classification::Processed);
        assert_eq!(rule_name(&rec), Some("protocol-ref"));
    }

    #[test]
    fn unmatched_records_are_raw() {
        assert_eq!(evaluate(&record("Sample1_R1.fastq.gz")), Classification::Raw);
    }

    #[test]
    fn classification_is_idempotent_and_cached() {
        let mut rec = record("GLDS-101_rna_seq_SampleTable.csv");
        let first = classify(&mut rec);
        // Changing inputs after the fact does not recompute.
        rec.filename = "plain.txt".to_string();
        let second = classify(&mut rec);
        assert_eq!(first, Classification::Processed);
        assert_eq!(first, second);
        assert_eq!(evaluate(&record("GLDS-101_rna_seq_SampleTable.csv")), first);
    }
}
