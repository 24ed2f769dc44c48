use crate::cert::columns::COLUMN_NAMES;
use crate::cli::args::{Cli, CompletionCommands, CompletionHelperCommands};
use crate::registry::CertificateRegistry;
use crate::utils::errors::Result;
use crate::utils::output::OutputFormat;
use crate::utils::paths::PROGRAM_NAME;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

pub fn handle_completion_command(command: &CompletionCommands) -> Result<()> {
    let shell = command.shell();
    let mut cmd = Cli::command();

    // For bash, complete ids and columns from the live registry
    if matches!(shell, Shell::Bash) {
        println!("# Enhanced completion for cert-registry ids and columns");
        print!(
            r#"
_cert_registry_complete_ids() {{
    local ids
    ids=$(cert-registry completion-helper ids 2>/dev/null)
    COMPREPLY=($(compgen -W "$ids" -- "${{cur}}"))
}}

_cert_registry_complete_columns() {{
    local columns
    columns=$(cert-registry completion-helper columns 2>/dev/null)

    # Handle comma-separated values and + prefix
    local current_word="${{cur}}"
    local prefix=""

    if [[ "$current_word" == +* ]]; then
        prefix="+"
        current_word="${{current_word:1}}"
    fi

    if [[ "$current_word" == *,* ]]; then
        prefix="${{prefix}}${{current_word%,*}},"
        current_word="${{current_word##*,}}"
    fi

    local word_list=""
    for col in $columns; do
        if [[ "$col" == "$current_word"* ]]; then
            word_list="$word_list ${{prefix}}${{col}}"
        fi
    done

    COMPREPLY=($(compgen -W "$word_list" -- "${{cur}}"))
}}

_cert_registry_override() {{
    local cur prev words cword
    _init_completion || return

    if [[ "$prev" == "--columns" ]]; then
        _cert_registry_complete_columns
        return 0
    fi

    case "${{words[1]}}" in
        edit|delete|deliver|undo-delivery|export|print)
            if [[ "$cur" != -* ]]; then
                _cert_registry_complete_ids
                return 0
            fi
            ;;
    esac

    # Fall back to the generated completion
    _cert-registry "$@"
}}

"#
        );

        generate(shell, &mut cmd, PROGRAM_NAME, &mut io::stdout());

        println!();
        println!("# Override the completion function");
        println!("complete -F _cert_registry_override cert-registry");
    } else {
        generate(shell, &mut cmd, PROGRAM_NAME, &mut io::stdout());
    }

    Ok(())
}

pub fn handle_completion_helper_command(
    command: &CompletionHelperCommands,
    registry: &CertificateRegistry,
    output: &OutputFormat,
) -> Result<()> {
    match command {
        CompletionHelperCommands::Ids => {
            let ids: Vec<String> = registry
                .certificates()
                .into_iter()
                .map(|cert| cert.id)
                .collect();
            output.print_list(&ids);
        }
        CompletionHelperCommands::Columns => output.print_list(&COLUMN_NAMES),
    }

    Ok(())
}
