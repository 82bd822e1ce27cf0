use crate::config::ClientFlags;
use crate::model::split_path;

pub const WINDOWS_OS: &str = "windows";

/// Probe run inside the container to land in the best available shell.
pub const SHELL_PROBE: &str = "command -v bash >/dev/null && exec bash || exec sh";

/// Assemble the kubectl argument list for an interactive shell into
/// `path`'s pod. Pure string assembly: no lookups, no side effects, total
/// over its inputs — empty strings mean "absent", never an error.
///
/// Ordering contract: interactive-exec prefix and target first, then client
/// flags (kubeconfig, context, token — only when non-empty), then the
/// container selector when given, then the separator and the platform shell
/// invocation (PowerShell on Windows, the POSIX probe elsewhere).
pub fn shell_args(path: &str, container: &str, flags: &ClientFlags, os: &str) -> Vec<String> {
    let (namespace, name) = split_path(path);

    let mut args: Vec<String> = vec!["exec".into(), "-it".into()];
    if let Some(namespace) = namespace {
        args.push("-n".into());
        args.push(namespace.into());
    }
    args.push(name.into());

    for (flag, value) in [
        ("--kubeconfig", flags.kubeconfig()),
        ("--context", flags.context()),
        ("--token", flags.token()),
    ] {
        if let Some(value) = value {
            args.push(flag.into());
            args.push(value.into());
        }
    }

    if !container.is_empty() {
        args.push("-c".into());
        args.push(container.into());
    }

    args.push("--".into());
    if os == WINDOWS_OS {
        args.push("powershell".into());
    } else {
        args.push("sh".into());
        args.push("-c".into());
        args.push(SHELL_PROBE.into());
    }

    args
}

#[cfg(test)]
mod tests {
    use super::{SHELL_PROBE, shell_args};
    use crate::config::ClientFlags;

    fn rendered(path: &str, container: &str, flags: &ClientFlags, os: &str) -> String {
        shell_args(path, container, flags, os).join(" ")
    }

    #[test]
    fn builds_shell_args_for_every_flag_combination() {
        let cases: &[(&str, &str, ClientFlags, &str, String)] = &[
            (
                "fred/blee",
                "c1",
                ClientFlags {
                    kubeconfig: Some("coolConfig".into()),
                    ..ClientFlags::default()
                },
                "darwin",
                format!("exec -it -n fred blee --kubeconfig coolConfig -c c1 -- sh -c {SHELL_PROBE}"),
            ),
            (
                "fred/blee",
                "c1",
                ClientFlags::default(),
                "linux",
                format!("exec -it -n fred blee -c c1 -- sh -c {SHELL_PROBE}"),
            ),
            (
                "fred/blee",
                "",
                ClientFlags::default(),
                "linux",
                format!("exec -it -n fred blee -- sh -c {SHELL_PROBE}"),
            ),
            (
                "fred/blee",
                "c1",
                ClientFlags::default(),
                "windows",
                "exec -it -n fred blee -c c1 -- powershell".to_string(),
            ),
            (
                "fred/blee",
                "c1",
                ClientFlags {
                    kubeconfig: Some("coolConfig".into()),
                    context: Some("coolContext".into()),
                    token: Some("coolToken".into()),
                },
                "windows",
                "exec -it -n fred blee --kubeconfig coolConfig --context coolContext --token coolToken -c c1 -- powershell"
                    .to_string(),
            ),
        ];

        for (path, container, flags, os, expected) in cases {
            assert_eq!(&rendered(path, container, flags, os), expected);
        }
    }

    #[test]
    fn empty_flag_strings_are_absent_not_errors() {
        let flags = ClientFlags {
            kubeconfig: Some(String::new()),
            context: Some(String::new()),
            token: None,
        };
        assert_eq!(
            rendered("fred/blee", "", &flags, "linux"),
            format!("exec -it -n fred blee -- sh -c {SHELL_PROBE}")
        );
    }

    #[test]
    fn cluster_scoped_paths_omit_the_namespace_flag() {
        assert_eq!(
            rendered("blee", "c1", &ClientFlags::default(), "linux"),
            format!("exec -it blee -c c1 -- sh -c {SHELL_PROBE}")
        );
    }
}
