pub(super) const ROOT_LONG_ABOUT: &str = "\
Scaffolds and safely maintains AI-assistant project files

aipim generates the prompt files AI coding assistants read (CLAUDE.md, GEMINI.md,
...) together with a .project directory holding context, tasks and decisions. Every
file aipim writes carries a signature trailer, so later updates can tell a file it
generated from one a person has edited.

CORE CONCEPTS:

  Signature trailer:
    The last two lines of a generated file:
      <!-- @aipim-signature: <sha256 of the content> -->
      <!-- @aipm-version: <aipim version> -->
    A file whose content still matches its signature is pristine and may be
    regenerated. Anything else is left alone.

  File status:
    - pristine: signed and unchanged since aipim wrote it
    - modified: signed, but edited afterwards
    - legacy:   no signature (written by hand or by an old version)
    - missing:  does not exist

  Backups:
    Before an update touches anything, .project is copied to
    .project-backups/<timestamp>.

TYPICAL WORKFLOW:

  1. Set up a project:
     $ aipim install --ai claude-code,gemini --guidelines node

  2. Check which files are still pristine:
     $ aipim status

  3. After upgrading aipim, regenerate untouched files:
     $ aipim update

  4. Work in sessions:
     $ aipim task init feat \"Add login\"
     $ aipim start
     $ aipim pause --reason \"meeting\" --stash
     $ aipim resume

  5. See which tasks wait on others:
     $ aipim deps

EXIT CODES:

  0    Success
  1    Unclean result (update errors, validation problems, dependency cycles)
  255  Error (I/O error, invalid configuration, etc.)

LOGGING:

  Use -v for progress messages and -vv for debug output. Without either flag,
  RUST_LOG selects the level (warn when unset).
";

pub(super) const INSTALL_LONG_ABOUT: &str = "\
Set up .project and generate the AI prompt files

Creates the .project directory structure, writes the scaffold files that do not
exist yet (context.md, the task template, helper scripts) and generates one prompt
file per AI tool. The choices are saved to .project/aipim.toml so that later
updates use them.

Running install again on a set-up project behaves like update for the prompt
files: .project is backed up first and files you edited are skipped.

OPTIONS:

  --ai <TOOL>,...
    AI tools to generate prompt files for. claude-code and claude-ai both map to
    CLAUDE.md, gemini to GEMINI.md, chatgpt to CHATGPT.md, and any other name to
    its upper-cased form. Defaults to the saved configuration, or
    claude-code,gemini.

  --guidelines <ID>,...
    Framework guidelines merged into the prompt: nextjs, astro, node, vue.

  --dry-run
    Report what would be done without writing anything.
";

pub(super) const UPDATE_LONG_ABOUT: &str = "\
Regenerate prompt files that have not been edited by hand

For every configured prompt file:

  missing   -> created
  pristine  -> regenerated and re-signed (updated)
  modified  -> skipped, your edits are kept
  legacy    -> skipped, the file was never signed

If .project exists it is backed up before the first write. A failed backup aborts
the update. A file that cannot be rendered or written is reported as error and the
remaining files are still processed; the command then exits with status 1.
";

pub(super) const STATUS_LONG_ABOUT: &str = "\
Show whether each managed file is pristine, modified, legacy or missing

Prints one line per prompt file listed in .project/aipim.toml (CLAUDE.md and
GEMINI.md when there is no configuration). Nothing is written.
";

pub(super) const START_LONG_ABOUT: &str = "\
Print a prompt to open a new assistant session

The prompt is assembled from .project/context.md (session number, next action,
current state), .project/current-task.md, the latest commits and the latest
decision records. Paste it into your assistant to pick up where you left off.

  --full         10 commits and 5 decisions instead of 3 and 1
  --file <FILE>  write the prompt to FILE
";

pub(super) const PAUSE_LONG_ABOUT: &str = "\
Record an interruption so the session can be resumed later

Writes .project/.interruption-snapshot.toml with the time, the reason, the current
task and whether the work tree had uncommitted changes. With --stash those changes
are stashed; resume pops the stash again.
";

pub(super) const DEPS_LONG_ABOUT: &str = "\
Show how backlog tasks depend on each other

Reads .project/current-task.md, .project/backlog and .project/completed. A task
lists the tasks it needs under `depends_on` and the tasks waiting for it under
`blocks`, either inline or one per line:

  ---
  title: \"feat: Profile page\"
  depends_on: [TASK-003]
  blocks:
    - TASK-007
  ---

A task that is not completed is blocked while any of its dependencies is not
completed or does not exist. TASK-003, T003 and 3 name the same task.

Exits with status 1 when the dependencies form a cycle.
";
