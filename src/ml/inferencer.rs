// ============================================================
// Layer 5 — Decoder (inference)
// ============================================================
// Turns raw sentences into translations, one sliding window at
// a time:
//
//   sentence ─► windower ─► window tokens ─► source ids
//            ─► inference bucket ─► single-example batch
//            ─► forward-only step ─► arg-max per position
//            ─► cut at first EOS ─► target tokens ─► sentence
//
// Two outputs share that path:
//   interactive — every decoded window, one line each
//   evaluate    — the first token of every decoded window, one
//                 line each, across the whole input file
//
// Decoding is greedy: the best class at each position, chosen
// independently. No beam search.

use std::io::{BufRead, Write};

use crate::data::windower::{segment, Window};
use crate::domain::bucket::{inference_bucket, Bucket, DataSet, Example};
use crate::domain::error::{TranslateError, TranslateResult};
use crate::domain::tokens::EOS_ID;
use crate::domain::traits::{PositionScores, TranslationModel};
use crate::infra::vocabulary::Vocabulary;

/// Batch-evaluation logs its progress this often (in sentences)
pub const EVAL_PROGRESS_INTERVAL: usize = 1_000;

const PROMPT: &str = "> ";

pub struct Decoder<M> {
    model:        M,
    buckets:      Vec<Bucket>,
    source_vocab: Vocabulary,
    target_vocab: Vocabulary,
}

impl<M: TranslationModel> Decoder<M> {
    /// Takes ownership of the model and switches it to one-example batches.
    pub fn new(mut model: M, buckets: Vec<Bucket>, source_vocab: Vocabulary, target_vocab: Vocabulary) -> Self {
        model.set_batch_size(1);
        Self { model, buckets, source_vocab, target_vocab }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Decode one window into a target-language sentence.
    pub fn decode_window(&mut self, window: &Window) -> TranslateResult<String> {
        let ids = self.source_vocab.sentence_to_token_ids(&window.to_sentence())?;

        let bucket_id = inference_bucket(&self.buckets, ids.len())
            .ok_or(TranslateError::NoBucket { length: ids.len() })?;

        let data = DataSet::single(self.buckets.len(), bucket_id, Example::new(ids, Vec::new()));
        let batch = self.model.get_batch(&data, bucket_id)?;
        let out = self.model.step(&batch, bucket_id, true)?;

        let logits = out
            .output_logits
            .ok_or_else(|| TranslateError::model("forward-only step returned no logits"))?;

        let outputs = truncate_at_eos(greedy_ids(&logits));
        let words = outputs
            .iter()
            .map(|&id| self.target_vocab.id_to_token(id))
            .collect::<TranslateResult<Vec<_>>>()?;

        Ok(words.join(" "))
    }

    /// Every window of `sentence`, decoded, in window order.
    pub fn decode_sentence(&mut self, sentence: &str) -> TranslateResult<Vec<String>> {
        segment(sentence)
            .map(|window| {
                let decoded = self.decode_window(&window)?;
                tracing::debug!("window [{}] → '{}'", window, decoded);
                Ok(decoded)
            })
            .collect()
    }

    /// Prompt, read a sentence, print its decoded windows; until EOF.
    pub fn interactive<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> TranslateResult<()> {
        let mut line = String::new();
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }

            for decoded in self.decode_sentence(line.trim_end())? {
                writeln!(output, "{decoded}")?;
            }
            output.flush()?;
        }
    }

    /// Write the first decoded token of every window of every input
    /// line. A window that decodes to nothing yields an empty line so
    /// the output stays aligned with the windows. Returns the number
    /// of sentences read.
    pub fn evaluate<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> TranslateResult<usize> {
        let mut sentences = 0usize;
        for line in input.lines() {
            let line = line?;
            for decoded in self.decode_sentence(&line)? {
                let first = decoded.split_whitespace().next().unwrap_or("");
                writeln!(output, "{first}")?;
            }
            sentences += 1;
            if sentences % EVAL_PROGRESS_INTERVAL == 0 {
                tracing::info!("  evaluated {} sentences", sentences);
            }
        }
        output.flush()?;
        Ok(sentences)
    }
}

/// Arg-max of the first batch row at every position.
pub fn greedy_ids(logits: &[PositionScores]) -> Vec<u32> {
    logits
        .iter()
        .filter_map(|position| position.first())
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0 as u32
        })
        .collect()
}

/// Keep everything before the first EOS (all of it when there is none).
pub fn truncate_at_eos(mut ids: Vec<u32>) -> Vec<u32> {
    if let Some(end) = ids.iter().position(|&id| id == EOS_ID) {
        ids.truncate(end);
    }
    ids
}
