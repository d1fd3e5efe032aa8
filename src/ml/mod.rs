// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Everything that touches burn lives in model.rs and
// translator.rs. The scheduler and the decoder are generic over
// the TranslationModel trait, so they never import burn and run
// in tests against a scripted fake.
//
//   model.rs       — TranslatorNet: embeddings, attention encoder,
//                    position-query cross-attention decoder,
//                    projection to the target vocabulary
//
//   translator.rs  — BurnTranslator: batching, SGD steps,
//                    learning-rate decay, CompactRecorder
//                    persistence
//
//   trainer.rs     — TrainingScheduler: size-weighted bucket
//                    sampling, running averages, decay gate,
//                    checkpoint and eval cadence
//
//   inferencer.rs  — Decoder: window → ids → bucket → greedy
//                    decode → EOS cut → target tokens
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning

/// Attention encoder-decoder network
pub mod model;

/// Burn implementation of the model traits
pub mod translator;

/// Training loop with checkpoint / eval cadence
pub mod trainer;

/// Greedy sliding-window decoder
pub mod inferencer;

#[cfg(test)]
pub mod testing;
