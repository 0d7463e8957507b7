// src/llm/prompts.rs
// Prompt text for the vision and advice requests

use std::fmt::Write;

use crate::analysis::types::GrowthStage;
use crate::llm::AdviceRequest;

pub fn vision_prompt(species: &[String], user_text: &str) -> String {
    let choices = species
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ");
    let stages = GrowthStage::ALL
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Analyze the plant in this image and return a JSON object with these fields:
1. "plantName": the plant species. You MUST choose exactly one of: {choices}.
2. "growthLevel": the growth stage, exactly one of [{stages}].
   - High: healthy, lush, vibrant green.
   - Medium: average condition, minor issues.
   - Low: visible wilting, discoloration, poor health.
   - DIE: dead or dying.
3. "caption": a detailed description of the plant's visible health: leaf color, drooping, vitality.

User description: {user_text}

Output ONLY the JSON object."#
    )
}

pub fn advice_prompt(request: &AdviceRequest, language: &str) -> String {
    let mut sensors = String::new();
    for c in &request.comparisons {
        let current = c
            .similar_avg
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "no data".to_string());
        let ideal = c
            .better_avg
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "no data".to_string());
        let _ = writeln!(
            sensors,
            "- {}: current {} (ideal {})",
            c.channel.label(),
            current,
            ideal
        );
    }

    let mut issues = String::new();
    for issue in &request.top_issues {
        let direction = if issue.is_above_ideal() { "higher" } else { "lower" };
        let _ = writeln!(
            issues,
            "- {} is {} than ideal ({:.1} vs {:.1})",
            issue.channel.label(),
            direction,
            issue.current,
            issue.ideal
        );
    }
    if issues.is_empty() {
        issues.push_str("- none identified\n");
    }

    let user_text = if request.user_text.trim().is_empty() {
        "(none)"
    } else {
        request.user_text.as_str()
    };

    format!(
        r#"You are a professional plant pathologist. Analyze the plant status and give care advice in {language}.

[Plant]
Name: {species}, health level: {stage}
Visual symptoms: {caption}

[User description]
{user_text}

[Environment compared with better-growing plants]
{sensors}
[Top issues]
{issues}
Return a JSON object with:
1. "analysis": an overall health analysis, at most 5 sentences, without specific numbers.
2. "keywords": 3-5 short keywords summarizing the status.
3. "careGuide": one entry per top issue, each {{"issue": title, "content": at most 3 sentences}}.

Output ONLY the JSON object."#,
        species = request.species,
        stage = request.growth_stage,
        caption = request.caption,
    )
}
