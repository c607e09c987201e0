//! Prompts for answer generation and metric judging.
//!
//! Templates use `{placeholder}` markers filled in by the caller.

/// Collection of prompts used for generation and evaluation.
pub struct Prompts;

impl Prompts {
    /// Prompt to answer a question from retrieved context.
    pub fn rag_answer() -> &'static str {
        r#"Answer the question using ONLY the provided context. If the context does not contain the answer, say so.

Context:
{context}

Question: {question}

Answer concisely. Do not mention the context or these instructions in your answer."#
    }

    /// Prompt to judge whether the answer is supported by the retrieved context.
    pub fn faithfulness() -> &'static str {
        r#"You are an expert judge evaluating a question-answering system.

Question: {question}

Retrieved Context:
{contexts}

Generated Answer: {answer}

Extract the claims made in the answer and check each one against the retrieved context. The score is the fraction of claims that the context supports (1.0 = every claim is supported, 0.0 = none are).

Respond in JSON format:
{
    "score": <0.0-1.0>,
    "reasoning": "<brief explanation>"
}

Respond with only the JSON, no other text."#
    }

    /// Prompt to judge whether the answer addresses the question.
    pub fn answer_relevance() -> &'static str {
        r#"You are an expert judge evaluating a question-answering system.

Question: {question}

Generated Answer: {answer}

Reference Answer: {ground_truth}

Rate how directly and completely the generated answer addresses the question (1.0 = fully addresses it, 0.0 = unrelated or evasive). Use the reference answer to judge completeness, not wording.

Respond in JSON format:
{
    "score": <0.0-1.0>,
    "reasoning": "<brief explanation>"
}

Respond with only the JSON, no other text."#
    }

    /// Prompt to judge how much of the retrieved context was relevant.
    pub fn context_precision() -> &'static str {
        r#"You are an expert judge evaluating a retrieval system.

Question: {question}

Retrieved Context (in order):
{contexts}

Reference Answer: {ground_truth}

For each context passage, decide whether it is relevant for answering the question. The score is the fraction of passages that are relevant (1.0 = every passage is relevant, 0.0 = none are).

Respond in JSON format:
{
    "score": <0.0-1.0>,
    "reasoning": "<brief explanation>"
}

Respond with only the JSON, no other text."#
    }

    /// Prompt to judge whether all needed context was retrieved.
    pub fn context_recall() -> &'static str {
        r#"You are an expert judge evaluating a retrieval system.

Question: {question}

Retrieved Context:
{contexts}

Reference Answer: {ground_truth}

Break the reference answer into the facts it states and check which of them can be attributed to the retrieved context. The score is the fraction of facts the context covers (1.0 = everything needed was retrieved, 0.0 = nothing was).

Respond in JSON format:
{
    "score": <0.0-1.0>,
    "reasoning": "<brief explanation>"
}

Respond with only the JSON, no other text."#
    }
}
