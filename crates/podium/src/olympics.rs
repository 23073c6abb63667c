//! Built-in configuration for the Tokyo Olympics datasets.

use indexmap::IndexMap;

use crate::clean::{CleaningRules, FillPolicy};
use crate::config::PipelineConfig;
use crate::input::LoaderConfig;
use crate::schema::{Column, DatasetDefinition, Schema, ValueType};
use crate::transform::{Derivation, JoinKind, Metric, Reducer, Step};

const UNKNOWN: &str = "Unknown";

fn text(name: &str) -> Column {
    Column::new(name, ValueType::String)
}

fn count(name: &str) -> Column {
    Column::new(name, ValueType::Integer)
}

fn fill_unknown(rules: CleaningRules, columns: &[&str]) -> CleaningRules {
    columns
        .iter()
        .fold(rules, |r, c| r.with_fill(*c, FillPolicy::default_value(UNKNOWN)))
}

fn fill_zero(rules: CleaningRules, columns: &[&str]) -> CleaningRules {
    columns
        .iter()
        .fold(rules, |r, c| r.with_fill(*c, FillPolicy::default_value(0i64)))
}

fn athletes() -> DatasetDefinition {
    DatasetDefinition::new(
        "athletes",
        "Athletes.csv",
        Schema::with_columns(vec![
            Column::required("PersonName", ValueType::String),
            text("Country"),
            text("Discipline"),
        ]),
    )
    .with_cleaning(fill_unknown(
        CleaningRules::new().with_rename("Country", "AthleteCountry"),
        &["Country", "Discipline"],
    ))
}

fn coaches() -> DatasetDefinition {
    DatasetDefinition::new(
        "coaches",
        "Coaches.csv",
        Schema::with_columns(vec![
            Column::required("Name", ValueType::String),
            text("Country"),
            text("Discipline"),
            text("Event"),
        ]),
    )
    .with_cleaning(fill_unknown(
        CleaningRules::new().with_rename("Country", "CoachCountry"),
        &["Country", "Discipline", "Event"],
    ))
}

fn entries_gender() -> DatasetDefinition {
    DatasetDefinition::new(
        "entries_gender",
        "EntriesGender.csv",
        Schema::with_columns(vec![
            Column::required("Discipline", ValueType::String),
            count("Female"),
            count("Male"),
            count("Total"),
        ]),
    )
    .with_cleaning(fill_zero(CleaningRules::new(), &["Female", "Male", "Total"]))
}

fn medals() -> DatasetDefinition {
    DatasetDefinition::new(
        "medals",
        "Medals.csv",
        Schema::with_columns(vec![
            count("Rank"),
            text("TeamCountry"),
            count("Gold"),
            count("Silver"),
            count("Bronze"),
            count("Total"),
            count("Rank by Total"),
        ]),
    )
    .with_cleaning(fill_zero(
        fill_unknown(
            CleaningRules::new().with_rename("TeamCountry", "MedalCountry"),
            &["TeamCountry"],
        ),
        &["Gold", "Silver", "Bronze", "Total", "Rank by Total"],
    ))
}

fn teams() -> DatasetDefinition {
    DatasetDefinition::new(
        "teams",
        "Teams.csv",
        Schema::with_columns(vec![
            Column::required("Name", ValueType::String),
            text("Discipline"),
            text("Country"),
            text("Event"),
        ]),
    )
    .with_cleaning(fill_unknown(
        CleaningRules::new().with_rename("Country", "TeamCountry"),
        &["Discipline", "Country", "Event"],
    ))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn regions() -> IndexMap<String, Vec<String>> {
    let mut regions = IndexMap::new();
    regions.insert(
        "North America".to_string(),
        strings(&["USA", "United States of America", "Canada", "Mexico"]),
    );
    regions.insert(
        "Europe".to_string(),
        strings(&["UK", "Great Britain", "France", "Germany"]),
    );
    regions
}

fn derivations() -> Vec<Derivation> {
    let mut row_count = IndexMap::new();
    row_count.insert("count".to_string(), Metric::count());

    vec![
        Derivation::new(
            "athletes_medals",
            Step::Join {
                left: "athletes".to_string(),
                right: "medals".to_string(),
                on: strings(&["athlete_country"]),
                right_on: strings(&["medal_country"]),
                kind: JoinKind::Left,
            },
        ),
        Derivation::new(
            "medals_per_country",
            Step::Aggregate {
                input: "medals".to_string(),
                group_by: strings(&["medal_country"]),
                metrics: row_count.clone(),
            },
        ),
        Derivation::new(
            "participants_per_discipline",
            Step::Aggregate {
                input: "athletes".to_string(),
                group_by: strings(&["discipline"]),
                metrics: row_count,
            },
        ),
        Derivation::new(
            "medals_long",
            Step::Unpivot {
                input: "medals".to_string(),
                index: strings(&["medal_country"]),
                value_columns: strings(&["gold", "silver", "bronze"]),
                key_name: "medal".to_string(),
                value_name: "count".to_string(),
            },
        ),
        Derivation::new(
            "medals_pivot",
            Step::Pivot {
                input: "medals_long".to_string(),
                index: strings(&["medal_country"]),
                pivot_column: "medal".to_string(),
                value_column: "count".to_string(),
                reducer: Reducer::Sum,
            },
        ),
        Derivation::new(
            "ranked_medals",
            Step::Rank {
                input: "medals".to_string(),
                partition_by: strings(&["medal_country"]),
                order_by: strings(&["total"]),
                descending: true,
                output: "rank".to_string(),
            },
        ),
        Derivation::new(
            "cumulative_medals",
            Step::CumulativeSum {
                input: "medals".to_string(),
                partition_by: strings(&["medal_country"]),
                order_by: strings(&["total"]),
                descending: true,
                source: "total".to_string(),
                output: "cumulative_medals".to_string(),
            },
        ),
        Derivation::new(
            "athletes_regions",
            Step::Categorize {
                input: "athletes".to_string(),
                source: "athlete_country".to_string(),
                output: "region".to_string(),
                categories: regions(),
                fallback: "Other".to_string(),
            },
        ),
        Derivation::new(
            "athletes_enriched",
            Step::Upper {
                input: "athletes_regions".to_string(),
                source: "athlete_country".to_string(),
                output: "upper_country".to_string(),
            },
        ),
        Derivation::new(
            "top_medal_countries",
            Step::TopN {
                input: "medals".to_string(),
                column: "total".to_string(),
                n: 10,
            },
        ),
    ]
}

impl PipelineConfig {
    /// The Olympics pipeline: five source datasets, their cleaning rules
    /// and the confirmed-tier derivations built from them.
    pub fn olympics() -> Self {
        PipelineConfig::new(vec![athletes(), coaches(), entries_gender(), medals(), teams()])
            .with_loader(LoaderConfig::default())
            .with_derivations(derivations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::output_name;

    #[test]
    fn test_registry_kinds() {
        let registry = PipelineConfig::olympics().registry().unwrap();
        let kinds: Vec<&str> = registry.kinds().collect();
        assert_eq!(kinds, vec!["athletes", "coaches", "entries_gender", "medals", "teams"]);
    }

    #[test]
    fn test_canonical_output_names() {
        let medals = medals();
        let names: Vec<String> = medals
            .schema
            .columns
            .iter()
            .map(|c| output_name(&medals.cleaning, &c.name))
            .collect();
        assert_eq!(
            names,
            vec!["rank", "medal_country", "gold", "silver", "bronze", "total", "rank_by_total"]
        );
        assert_eq!(output_name(&teams().cleaning, "Country"), "team_country");
        assert_eq!(output_name(&athletes().cleaning, "PersonName"), "person_name");
    }

    #[test]
    fn test_derivations_validate() {
        let config = PipelineConfig::olympics();
        assert_eq!(config.derivations.len(), 10);
        config.validate().unwrap();
    }
}
