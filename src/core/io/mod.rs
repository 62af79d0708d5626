pub mod bam;
pub mod fasta;
pub mod table;
pub mod vcf;
