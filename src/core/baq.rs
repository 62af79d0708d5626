//! Base Alignment Quality: a glocal pair HMM run against the reference
//! around each read's alignment window, capping reported qualities by the
//! posterior confidence of each base's placement. Banded forward/backward
//! with per-row scaling, after Heng Li's original formulation.

use bio_types::genome::Position;
use rayon::prelude::*;

use crate::core::batch::AlignmentBatch;
use crate::core::cigar::CigarEvent;
use crate::core::context::BatchContext;
use crate::core::dna::Nucleotide;
use crate::core::genome::ReferenceGenome;
use crate::core::phred::{qual_to_error_prob, MAX_PHRED};

#[derive(Clone, Copy, Debug)]
pub struct BaqParams {
    pub gap_open: f64,
    pub gap_extend: f64,
    pub bandwidth: usize,
    /// Floor for recalibrated qualities; also the emission clamp.
    pub min_quality: u8,
}

impl Default for BaqParams {
    fn default() -> Self {
        BaqParams { gap_open: 1e-3, gap_extend: 1e-4, bandwidth: 7, min_quality: 6 }
    }
}

// emission probabilities for mismatches (one of three bases) and insertions
const EM: f64 = 1.0 / 3.0;
const EI: f64 = 0.25;

/// Runs BAQ over every active read, overwriting `ctx.baq_quals`. Returns the
/// number of reads for which the HMM was computed; reads where it fails keep
/// their reported qualities.
pub fn recalibrate_batch(
    batch: &AlignmentBatch,
    ctx: &mut BatchContext,
    genome: &ReferenceGenome,
    params: &BaqParams,
) -> u64 {
    let shared: &BatchContext = ctx;
    let results: Vec<Option<(usize, Vec<u8>)>> = shared
        .active_reads
        .par_iter()
        .map(|&read| recalibrate_read(batch, shared, genome, params, read))
        .collect();

    let mut computed = 0;
    for (start, quals) in results.into_iter().flatten() {
        ctx.baq_quals[start..start + quals.len()].copy_from_slice(&quals);
        computed += 1;
    }
    computed
}

fn recalibrate_read(
    batch: &AlignmentBatch,
    ctx: &BatchContext,
    genome: &ReferenceGenome,
    params: &BaqParams,
    read: u32,
) -> Option<(usize, Vec<u8>)> {
    let record = &batch.reads[read as usize];
    let range = ctx.read_bases(read);
    let events = &ctx.events[range.clone()];

    // soft clips take no part in the alignment
    let qstart = events.iter().position(|&e| e != CigarEvent::SoftClip)?;
    let qend = events.iter().rposition(|&e| e != CigarEvent::SoftClip)? + 1;
    if qend <= qstart {
        return None;
    }

    let window = ctx.sequence_windows[read as usize];
    let band = params.bandwidth as Position;
    let ref_start = window.0.saturating_sub(band);
    let ref_end = (window.1 + band).min(genome.sequence_len(record.sequence_id) - 1);
    let ref_global = genome.global_pos(record.sequence_id, ref_start);
    let ref_len = (ref_end - ref_start + 1) as usize;

    let refseq: Vec<Nucleotide> = (0..ref_len).map(|k| genome.base(ref_global + k as Position)).collect();
    let query: Vec<Nucleotide> = (qstart..qend).map(|i| record.bases.get(i)).collect();
    let quals = &record.quals[qstart..qend];

    let (state, bq) = hmm_glocal(&refseq, &query, quals, params)?;

    let mut out = record.quals.clone();
    for i in qstart..qend {
        if events[i] != CigarEvent::Match {
            continue;
        }
        let expected = (record.alignment_start + ctx.read_offsets[range.start + i] as Position - ref_start) as u32;
        let st = state[i - qstart];
        let aligned = (st & 3) == 0 && (st >> 2) == expected;
        out[i] = cap_quality(record.quals[i], aligned, bq[i - qstart], params.min_quality);
    }
    Some((range.start, out))
}

/// Final per-base cap: a base the HMM places off its alignment diagonal (or
/// in an indel state) drops to the floor; an aligned base is capped by the
/// posterior quality. Never exceeds the reported quality.
#[inline]
fn cap_quality(reported: u8, aligned: bool, bq: u8, min_quality: u8) -> u8 {
    let capped = if aligned { bq } else { min_quality };
    reported.min(capped.max(min_quality))
}

#[inline]
fn epsilon(reference: Nucleotide, query: Nucleotide, qual: u8, min_quality: u8) -> f64 {
    if reference == Nucleotide::Unknown || query == Nucleotide::Unknown {
        return 1.0;
    }
    let err = qual_to_error_prob(qual.max(min_quality));
    if reference == query {
        1.0 - err
    } else {
        err * EM
    }
}

#[inline]
fn set_u(bw: usize, i: usize, k: usize) -> usize {
    (k + 1 - i.saturating_sub(bw)) * 3
}

/// Banded scaled forward/backward over the 3-state (match/insert/delete)
/// glocal HMM. Returns, per query base, the MAP state `(ref_pos << 2) |
/// type` and the Phred-scaled posterior quality. None signals numerical
/// breakdown; the caller keeps reported qualities.
fn hmm_glocal(refseq: &[Nucleotide], query: &[Nucleotide], quals: &[u8], params: &BaqParams) -> Option<(Vec<u32>, Vec<u8>)> {
    let (l_ref, l_query) = (refseq.len(), query.len());
    if l_ref == 0 || l_query == 0 {
        return None;
    }

    let mut bw = params.bandwidth.min(l_query).min(l_ref);
    if bw < l_ref.max(l_query) - l_ref.min(l_query) {
        bw = l_ref.max(l_query) - l_ref.min(l_query);
    }
    let bw2 = bw * 2 + 1;
    let stride = bw2 * 3 + 6;

    let mut f = vec![0.0f64; (l_query + 1) * stride];
    let mut b = vec![0.0f64; (l_query + 1) * stride];
    let mut s = vec![0.0f64; l_query + 2];

    // transitions: begin/end states enter and leave uniformly, gaps per the
    // open/extend rates
    let sm = 1.0 / (2.0 * l_query as f64 + 2.0);
    let si = sm;
    let (cd, ce) = (params.gap_open, params.gap_extend);
    let bm = (1.0 - cd) / l_ref as f64;
    let bi = cd / l_ref as f64;
    let m = [
        (1.0 - cd - cd) * (1.0 - sm),
        cd * (1.0 - sm),
        cd * (1.0 - sm),
        (1.0 - ce) * (1.0 - si),
        ce * (1.0 - si),
        0.0,
        1.0 - ce,
        0.0,
        ce,
    ];

    /*** forward ***/
    f[set_u(bw, 0, 0)] = 1.0;
    s[0] = 1.0;
    {
        let row = &mut f[stride..2 * stride];
        let end = l_ref.min(bw + 1);
        let mut sum = 0.0;
        for k in 1..=end {
            let u = set_u(bw, 1, k);
            let e = epsilon(refseq[k - 1], query[0], quals[0], params.min_quality);
            row[u] = e * bm;
            row[u + 1] = EI * bi;
            sum += row[u] + row[u + 1];
        }
        if !(sum > 0.0) || !sum.is_finite() {
            return None;
        }
        s[1] = sum;
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
    for i in 2..=l_query {
        let (prev, cur) = f.split_at_mut(i * stride);
        let prev = &prev[(i - 1) * stride..];
        let row = &mut cur[..stride];
        let beg = 1usize.max(i.saturating_sub(bw));
        let end = l_ref.min(i + bw);
        let mut sum = 0.0;
        for k in beg..=end {
            let u = set_u(bw, i, k);
            let v11 = set_u(bw, i - 1, k - 1);
            let v10 = set_u(bw, i - 1, k);
            let v01 = set_u(bw, i, k - 1);
            let e = epsilon(refseq[k - 1], query[i - 1], quals[i - 1], params.min_quality);
            row[u] = e * (m[0] * prev[v11] + m[3] * prev[v11 + 1] + m[6] * prev[v11 + 2]);
            row[u + 1] = EI * (m[1] * prev[v10] + m[4] * prev[v10 + 1]);
            row[u + 2] = m[2] * row[v01] + m[8] * row[v01 + 2];
            sum += row[u] + row[u + 1] + row[u + 2];
        }
        if !(sum > 0.0) || !sum.is_finite() {
            return None;
        }
        s[i] = sum;
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
    {
        let row = &f[l_query * stride..(l_query + 1) * stride];
        let mut sum = 0.0;
        for k in 1..=l_ref {
            let u = set_u(bw, l_query, k);
            if u < 3 || u >= bw2 * 3 + 3 {
                continue;
            }
            sum += row[u] * sm + row[u + 1] * si;
        }
        if !(sum > 0.0) || !sum.is_finite() {
            return None;
        }
        s[l_query + 1] = sum;
    }

    /*** backward ***/
    {
        let row = &mut b[l_query * stride..(l_query + 1) * stride];
        for k in 1..=l_ref {
            let u = set_u(bw, l_query, k);
            if u < 3 || u >= bw2 * 3 + 3 {
                continue;
            }
            row[u] = sm / s[l_query] / s[l_query + 1];
            row[u + 1] = si / s[l_query] / s[l_query + 1];
        }
    }
    for i in (1..l_query).rev() {
        let (cur, next) = b.split_at_mut((i + 1) * stride);
        let next = &next[..stride];
        let row = &mut cur[i * stride..];
        let beg = 1usize.max(i.saturating_sub(bw));
        let end = l_ref.min(i + bw);
        let y = if i > 1 { 1.0 } else { 0.0 };
        for k in (beg..=end).rev() {
            let u = set_u(bw, i, k);
            let v11 = set_u(bw, i + 1, k + 1);
            let v10 = set_u(bw, i + 1, k);
            let v01 = set_u(bw, i, k + 1);
            let e = if k >= l_ref {
                0.0
            } else {
                epsilon(refseq[k], query[i], quals[i], params.min_quality) * next[v11]
            };
            row[u] = e * m[0] + EI * m[1] * next[v10 + 1] + m[2] * row[v01 + 2];
            row[u + 1] = e * m[3] + EI * m[4] * next[v10 + 1];
            row[u + 2] = (e * m[6] + m[8] * row[v01 + 2]) * y;
        }
        let scale = 1.0 / s[i];
        for x in row[..stride].iter_mut() {
            *x *= scale;
        }
    }

    /*** MAP state and quality per query base ***/
    let mut state = vec![0u32; l_query];
    let mut bq = vec![0u8; l_query];
    for i in 1..=l_query {
        let fi = &f[i * stride..(i + 1) * stride];
        let bi = &b[i * stride..(i + 1) * stride];
        let beg = 1usize.max(i.saturating_sub(bw));
        let end = l_ref.min(i + bw);
        let (mut sum, mut max, mut max_state) = (0.0f64, 0.0f64, 0u32);
        for k in beg..=end {
            let u = set_u(bw, i, k);
            let z = fi[u] * bi[u];
            sum += z;
            if z > max {
                max = z;
                max_state = (k as u32 - 1) << 2;
            }
            let z = fi[u + 1] * bi[u + 1];
            sum += z;
            if z > max {
                max = z;
                max_state = ((k as u32 - 1) << 2) | 1;
            }
        }
        if !(sum > 0.0) || !sum.is_finite() {
            return None;
        }
        max /= sum;
        state[i - 1] = max_state;
        let err = 1.0 - max;
        let q = if err <= 0.0 { MAX_PHRED as i32 } else { (-4.343 * err.ln() + 0.499) as i32 };
        bq[i - 1] = q.max(params.min_quality as i32).min(MAX_PHRED as i32) as u8;
    }

    Some((state, bq))
}
