use std::io::{self, Write};

use crate::core::covariates::empirical::EmpiricalValue;
use crate::core::covariates::{decode_context, decode_cycle, Covariate, CovariateChain, CovariateKey, EventType};
use crate::core::io::table::{write_report, Cell, ColumnFormat, GatkTable};
use crate::core::pipeline::Recalibration;

/// Renders the recalibration result as a GATK-compatible report:
/// RecalTable0 (read groups), RecalTable1 (reported qualities) and
/// RecalTable2 (optional covariates), in this order.
pub fn report(out: &mut impl Write, recal: &Recalibration) -> io::Result<()> {
    let mut tables = vec![read_groups(recal), qualities(recal)];
    if recal.context_table.is_some() || recal.cycle_table.is_some() {
        tables.push(covariates(recal));
    }
    write_report(out, &tables)
}

fn decode(recal: &Recalibration, chain: &CovariateChain, key: CovariateKey) -> (String, u8, EventType) {
    let group = recal.read_groups.name(chain.decode(key, Covariate::ReadGroup)).to_owned();
    let qual = chain.decode(key, Covariate::QualityScore) as u8;
    let event = EventType::from_code(chain.decode(key, Covariate::EventType));
    (group, qual, event)
}

fn read_groups(recal: &Recalibration) -> GatkTable {
    let mut table = GatkTable::new(
        "RecalTable0",
        "Read group quality table",
        &[
            ("ReadGroup", ColumnFormat::String),
            ("EventType", ColumnFormat::Char),
            ("EmpiricalQuality", ColumnFormat::Float4),
            ("EstimatedQReported", ColumnFormat::Float4),
            ("Observations", ColumnFormat::Uint64),
            ("Errors", ColumnFormat::Float2),
        ],
    );

    let mut rows = Vec::new();
    for (key, value) in recal.read_group_table.iter() {
        if value.observations == 0 {
            continue;
        }
        let (group, _, event) = decode(recal, &recal.quality_chain, key);
        rows.push((
            (group.clone(), event.ascii()),
            vec![
                Cell::Str(group),
                Cell::Char(event.ascii()),
                Cell::Float(value.empirical_quality),
                Cell::Float(value.estimated_quality),
                Cell::Uint(value.observations),
                Cell::Float(value.mismatches),
            ],
        ));
    }
    sorted(&mut table, rows);
    table
}

fn qualities(recal: &Recalibration) -> GatkTable {
    let mut table = GatkTable::new(
        "RecalTable1",
        "Quality score recalibration table",
        &[
            ("ReadGroup", ColumnFormat::String),
            ("QualityScore", ColumnFormat::String),
            ("EventType", ColumnFormat::Char),
            ("EmpiricalQuality", ColumnFormat::Float4),
            ("Observations", ColumnFormat::Uint64),
            ("Errors", ColumnFormat::Float2),
        ],
    );

    let mut rows = Vec::new();
    for (key, value) in recal.quality_table.iter() {
        if value.observations == 0 {
            continue;
        }
        let (group, qual, event) = decode(recal, &recal.quality_chain, key);
        rows.push((
            (group.clone(), qual, event.ascii()),
            vec![
                Cell::Str(group),
                Cell::Str(qual.to_string()),
                Cell::Char(event.ascii()),
                Cell::Float(value.empirical_quality),
                Cell::Uint(value.observations),
                Cell::Float(value.mismatches),
            ],
        ));
    }
    sorted(&mut table, rows);
    table
}

fn covariates(recal: &Recalibration) -> GatkTable {
    let mut table = GatkTable::new(
        "RecalTable2",
        "Optional covariates recalibration table",
        &[
            ("ReadGroup", ColumnFormat::String),
            ("QualityScore", ColumnFormat::String),
            ("CovariateValue", ColumnFormat::String),
            ("CovariateName", ColumnFormat::String),
            ("EventType", ColumnFormat::Char),
            ("EmpiricalQuality", ColumnFormat::Float4),
            ("Observations", ColumnFormat::Uint64),
            ("Errors", ColumnFormat::Float2),
        ],
    );

    let mut rows = Vec::new();
    if let Some(context) = &recal.context_table {
        for (key, value) in context.iter() {
            let raw = recal.context_chain.decode(key, Covariate::Context);
            let (group, qual, event) = decode(recal, &recal.context_chain, key);
            let k = match event {
                EventType::Match => recal.options.mismatches_context_size,
                _ => recal.options.indels_context_size,
            };
            push_covariate(&mut rows, group, qual, decode_context(raw, k), "Context", event, value);
        }
    }
    if let Some(cycle) = &recal.cycle_table {
        for (key, value) in cycle.iter() {
            let raw = recal.cycle_chain.decode(key, Covariate::Cycle);
            let (group, qual, event) = decode(recal, &recal.cycle_chain, key);
            push_covariate(&mut rows, group, qual, decode_cycle(raw).to_string(), "Cycle", event, value);
        }
    }
    sorted(&mut table, rows);
    table
}

type CovariateRow = ((String, u8, &'static str, String, char), Vec<Cell>);

fn push_covariate(
    rows: &mut Vec<CovariateRow>,
    group: String,
    qual: u8,
    covariate: String,
    name: &'static str,
    event: EventType,
    value: &EmpiricalValue,
) {
    if value.observations == 0 {
        return;
    }
    rows.push((
        (group.clone(), qual, name, covariate.clone(), event.ascii()),
        vec![
            Cell::Str(group),
            Cell::Str(qual.to_string()),
            Cell::Str(covariate),
            Cell::Str(name.to_owned()),
            Cell::Char(event.ascii()),
            Cell::Float(value.empirical_quality),
            Cell::Uint(value.observations),
            Cell::Float(value.mismatches),
        ],
    ));
}

fn sorted<K: Ord>(table: &mut GatkTable, mut rows: Vec<(K, Vec<Cell>)>) {
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    for (_, cells) in rows {
        table.row(cells);
    }
}
