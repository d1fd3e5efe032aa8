// ============================================================
// Layer 5 — Translator Network (Burn)
// ============================================================
// A small attention encoder-decoder over fixed-length buckets.
//
//   source ids [batch, S]
//     → token + position embeddings
//     → N encoder blocks (self-attention + GELU FFN), PAD keys masked
//   target positions [batch, T]
//     → position embeddings used as decoder queries
//     → cross-attention over the encoder states
//     → one more encoder-style block over the T positions
//     → LayerNorm → Linear → logits [batch, T, target_vocab]
//
// Decoding is one-shot: every target position is predicted from
// the source alone, so training and greedy decoding run the same
// graph and the decoder never has to feed its own output back.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Bahdanau et al. (2015) Neural Machine Translation
//            by Jointly Learning to Align and Translate

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::tokens::PAD_ID;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TranslatorNetConfig {
    pub source_vocab_size: usize,
    pub target_vocab_size: usize,
    /// Longest encoder input of any bucket
    pub max_source_len:    usize,
    /// Longest decoder input of any bucket
    pub max_target_len:    usize,
    pub d_model:           usize,
    pub num_heads:         usize,
    pub num_layers:        usize,
    pub d_ff:              usize,
    #[config(default = 0.0)]
    pub dropout:           f64,
}

impl TranslatorNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TranslatorNet<B> {
        let source_embedding = EmbeddingConfig::new(self.source_vocab_size, self.d_model).init(device);
        let source_position  = EmbeddingConfig::new(self.max_source_len, self.d_model).init(device);
        let encoder: Vec<AttentionBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_block(device))
            .collect();
        let target_position  = EmbeddingConfig::new(self.max_target_len, self.d_model).init(device);
        let cross_attn       = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let cross_norm       = LayerNormConfig::new(self.d_model).init(device);
        let decoder          = self.build_block(device);
        let final_norm       = LayerNormConfig::new(self.d_model).init(device);
        let projection       = LinearConfig::new(self.d_model, self.target_vocab_size).init(device);
        let dropout          = DropoutConfig::new(self.dropout).init();
        TranslatorNet {
            source_embedding, source_position, encoder,
            target_position, cross_attn, cross_norm, decoder,
            final_norm, projection, dropout,
        }
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> AttentionBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        AttentionBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── AttentionBlock ───────────────────────────────────────────────────────────
/// Post-norm self-attention + feed-forward block.
#[derive(Module, Debug)]
pub struct AttentionBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> AttentionBlock<B> {
    /// `mask_pad` marks key positions to ignore (true = padding).
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let mut input = MhaInput::self_attn(x.clone());
        if let Some(mask) = mask_pad {
            input = input.mask_pad(mask);
        }
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── TranslatorNet ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TranslatorNet<B: Backend> {
    pub source_embedding: Embedding<B>,
    pub source_position:  Embedding<B>,
    pub encoder:          Vec<AttentionBlock<B>>,
    pub target_position:  Embedding<B>,
    pub cross_attn:       MultiHeadAttention<B>,
    pub cross_norm:       LayerNorm<B>,
    pub decoder:          AttentionBlock<B>,
    pub final_norm:       LayerNorm<B>,
    pub projection:       Linear<B>,
    pub dropout:          Dropout,
}

impl<B: Backend> TranslatorNet<B> {
    /// source: [batch, S] → logits: [batch, target_len, target_vocab]
    pub fn forward(&self, source: Tensor<B, 2, Int>, target_len: usize) -> Tensor<B, 3> {
        let [batch_size, source_len] = source.dims();
        let device = source.device();

        let pad_mask = source.clone().equal_elem(PAD_ID as i64);

        let positions = Tensor::<B, 1, Int>::arange(0..source_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, source_len]);
        let mut memory = self.dropout.forward(
            self.source_embedding.forward(source) + self.source_position.forward(positions)
        );
        for block in &self.encoder {
            memory = block.forward(memory, Some(pad_mask.clone()));
        }

        let target_positions = Tensor::<B, 1, Int>::arange(0..target_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, target_len]);
        let queries = self.target_position.forward(target_positions);

        let context = self.cross_attn
            .forward(MhaInput::new(queries.clone(), memory.clone(), memory).mask_pad(pad_mask))
            .context;
        let x = self.cross_norm.forward(queries + self.dropout.forward(context));
        let x = self.decoder.forward(x, None);

        self.projection.forward(self.final_norm.forward(x))
    }

    /// Mean cross-entropy over non-PAD targets, plus the logits.
    /// targets: [batch, target_len]
    pub fn forward_loss(
        &self,
        source:     Tensor<B, 2, Int>,
        target_len: usize,
        targets:    Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward(source, target_len);
        let [batch_size, positions, vocab] = logits.dims();

        let ce = CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![PAD_ID as usize]))
            .init(&logits.device());
        let loss = ce.forward(
            logits.clone().reshape([batch_size * positions, vocab]),
            targets.reshape([batch_size * positions]),
        );
        (loss, logits)
    }
}
