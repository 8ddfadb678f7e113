//! Templates compiled into the binary, used when no templates directory is configured.

pub(super) const PROJECT_MANAGER: &str = r#"# Project Manager

You are working in a project managed with aipim. Project state lives in the
`.project/` directory and is the single source of truth between sessions.

## Session Start Protocol

1. Read `.project/context.md` to learn where the last session stopped.
2. Read `.project/current-task.md` if it exists and find the first unchecked item.
3. Skim the most recent entries in `.project/decisions/`.
4. Summarize the state back before writing any code.

## Working Rules

- Work on one task at a time; tasks live in `.project/backlog/`.
- Tick checkboxes in the task file as items are completed.
- Record architectural decisions as new files in `.project/decisions/`.
- Never mark a task done before its definition of done is met
  (`.project/scripts/validate-dod.sh`).

## Session End Protocol

1. Update `.project/context.md`: bump `session`, set `last_updated` and
   `next_action`, rewrite the `# Current State` section.
2. Commit with a message that references the task id.

## Framework Guidelines

{{SLOT:guidelines}}
{{/SLOT:guidelines}}
"#;

pub(super) const GUIDELINE_NEXTJS: &str = r#"## Next.js (App Router)

- Prefer Server Components; add `"use client"` only where interactivity is required.
- Fetch data in Server Components or Route Handlers, not in client effects.
- Keep route segments under `app/`; colocate `loading.tsx` and `error.tsx`.
- Use `next/image` and `next/font` instead of raw tags.
"#;

pub(super) const GUIDELINE_ASTRO: &str = r#"## Astro (modern)

- Ship zero JavaScript by default; hydrate islands with the narrowest `client:*` directive.
- Use content collections with schemas for structured content.
- Keep pages in `src/pages/` and shared layouts in `src/layouts/`.
"#;

pub(super) const GUIDELINE_NODE: &str = r#"## Node.js (Generic)

- Use ES modules and `async`/`await`; never block the event loop with sync I/O in request paths.
- Validate all external input at the boundary.
- Keep configuration in environment variables, loaded once at startup.
"#;

pub(super) const GUIDELINE_VUE: &str = r#"## Vue 3

- Use the Composition API with `<script setup>`.
- Keep components small; move shared state into composables or a store.
- Type props and emits explicitly.
"#;

pub(super) const CONTEXT: &str = r#"---
session: 1
last_updated: 1970-01-01T00:00:00Z
next_action: "Create the first task with `aipim task init`"
active_branches: []
---

# Current State

Project scaffolding was just installed. No work has been done yet.

# Notes
"#;

pub(super) const TASK_TEMPLATE: &str = r#"---
title: "Task Name"
created: 1970-01-01T00:00:00Z
last_updated: 1970-01-01T00:00:00Z
status: todo
estimated_hours: 0
actual_hours: 0
---

# Task: [Task Name]

## Objective

Describe the outcome this task delivers in one or two sentences.

## Plan

### Phase 1: Preparation
- [ ] Read the relevant code and decisions
- [ ] Write down the approach

### Phase 2: Implementation
- [ ] Implement the change
- [ ] Add or update tests

### Phase 3: Wrap-up
- [ ] Update documentation
- [ ] Update `.project/context.md`

## Definition of Done

- [ ] Tests pass
- [ ] No new warnings
"#;

pub(super) const PRE_SESSION_SCRIPT: &str = r#"#!/usr/bin/env sh
# Prints a short project status before an AI session starts.
set -eu

cd "$(dirname "$0")/../.."

echo "== Branch"
git rev-parse --abbrev-ref HEAD 2>/dev/null || echo "(not a git repository)"

echo "== Uncommitted changes"
git status --short 2>/dev/null || true

if [ -f .project/current-task.md ]; then
    echo "== Current task"
    grep -m1 '^title:' .project/current-task.md || true
    done=$(grep -c -- '- \[x\]' .project/current-task.md || true)
    open=$(grep -c -- '- \[ \]' .project/current-task.md || true)
    echo "Progress: $done done, $open open"
fi
"#;

pub(super) const VALIDATE_DOD_SCRIPT: &str = r#"#!/usr/bin/env sh
# Fails while the current task still has unchecked definition-of-done items.
set -eu

cd "$(dirname "$0")/../.."

task=.project/current-task.md
if [ ! -f "$task" ]; then
    echo "No current task"
    exit 0
fi

open=$(sed -n '/^## Definition of Done/,/^## /p' "$task" | grep -c -- '- \[ \]' || true)
if [ "$open" -gt 0 ]; then
    echo "$open definition-of-done item(s) still open"
    exit 1
fi
echo "Definition of done met"
"#;
