// Prompt templates for the LLM-backed content oracle.
// Placeholders in {braces} are filled by `oracle::build_prompt`.

pub const PROPOSE_SYSTEM: &str = "You are an instructional designer writing slide content \
    for a technical course. You respond with JSON only: an object with a single key \
    \"blocks\" whose value is an array of content blocks. Each block has a \"type\" of \
    \"bullet_list\" (optional \"heading\", required \"items\" array of strings), \
    \"image\" (optional \"caption\"), \"callout\" (required \"text\") or \
    \"paragraph\" (required \"text\").";

pub const PROPOSE_PROMPT_TEMPLATE: &str = r#"
Lesson: {lesson_title}
Slide heading: {heading}

{fidelity_instruction}

Write slide content covering ONLY these lesson points (part {increment} of {total_increments}):
{points}

Size limits (hard limits for the slide, keep well under them):
- At most {max_blocks} block(s).
- At most {max_bullets} items per bullet_list.
- At most {max_chars} characters per bullet item, callout or paragraph.
{mode_instruction}

Return JSON: {"blocks": [ ... ]}
"#;

pub const INCREMENTAL_MODE_INSTRUCTION: &str =
    "- This is one increment of a longer slide sequence; do not repeat earlier points or add a summary.";

pub const WHOLE_SLIDE_MODE_INSTRUCTION: &str =
    "- Propose the complete content of one slide for all points above.";
