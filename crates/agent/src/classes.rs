// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-time agent class registry.
//!
//! The original system loaded agent classes from module paths at runtime; a
//! compiled binary registers them here instead, keyed by the job file's
//! `type` field. The `module` field is accepted as a legacy alias and
//! otherwise ignored.

use crate::card::Skill;
use crate::tools::ToolRegistry;

/// A registered agent class: prompt, advertised skills, and domain tools.
#[derive(Clone)]
pub struct AgentClass {
    pub type_name: &'static str,
    pub description: &'static str,
    pub base_prompt: &'static str,
    pub skills: fn() -> Vec<Skill>,
    /// Adds the class's domain tools on top of the A2A transport tools.
    pub register_tools: fn(&mut ToolRegistry),
}

fn no_tools(_registry: &mut ToolRegistry) {}

fn assistant_skills() -> Vec<Skill> {
    vec![Skill {
        id: "general-assistance".to_string(),
        name: "General assistance".to_string(),
        description: "Answers questions directly or by delegating to connected agents".to_string(),
        tags: vec!["general".to_string()],
        examples: vec!["Summarize the weather for my trip".to_string()],
    }]
}

fn controller_skills() -> Vec<Skill> {
    vec![Skill {
        id: "orchestration".to_string(),
        name: "Query orchestration".to_string(),
        description: "Decomposes a request and routes sub-questions to connected agents".to_string(),
        tags: vec!["routing".to_string(), "orchestration".to_string()],
        examples: vec!["Plan a picnic using the weather and maps agents".to_string()],
    }]
}

const ASSISTANT_PROMPT: &str = "You are a helpful assistant agent in a multi-agent system. \
Answer questions directly when you can. When a connected agent is better suited, delegate \
with the query_agent tool and weave its answer into your reply.";

const CONTROLLER_PROMPT: &str = "You are a controller agent coordinating a fleet of \
specialist agents. Break the user's request into sub-questions, send each to the most \
suitable connected agent with the query_agent tool, and synthesize one coherent answer. \
Prefer delegation over guessing.";

/// All compile-time registered classes.
pub fn builtin() -> &'static [AgentClass] {
    &[
        AgentClass {
            type_name: "assistant",
            description: "General-purpose assistant",
            base_prompt: ASSISTANT_PROMPT,
            skills: assistant_skills,
            register_tools: no_tools,
        },
        AgentClass {
            type_name: "controller",
            description: "Routes and synthesizes across connected agents",
            base_prompt: CONTROLLER_PROMPT,
            skills: controller_skills,
            register_tools: no_tools,
        },
    ]
}

/// Look up a class by `type`; unknown types fall back to `assistant` with a
/// warning so a typo in a job file degrades instead of bricking the agent.
pub fn lookup(type_name: &str) -> AgentClass {
    if let Some(class) = builtin().iter().find(|c| c.type_name == type_name) {
        return class.clone();
    }
    tracing::warn!(agent_type = type_name, "unknown agent type, using 'assistant'");
    builtin()[0].clone()
}

#[cfg(test)]
#[path = "classes_tests.rs"]
mod tests;
