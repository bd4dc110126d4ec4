use super::{CallKind, Error, InvocationPattern, PatternRegistry};
use crate::jvm::BinaryName;

/// Read a registry out of a pattern configuration file
///
/// Each non-blank line that does not start with `#` describes one pattern:
///
/// ```text
/// # kind   [interface]  owner              name   descriptor
/// static                java/lang/System   exit   (I)V
/// virtual               java/lang/Runtime  halt   (I)V
/// ```
pub fn parse_patterns(
    interceptor: BinaryName,
    source: &str,
) -> Result<PatternRegistry, Error> {
    let mut patterns = vec![];

    for (line_idx, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad_line = |message: String| Error::BadConfigLine {
            line: line_idx + 1,
            message,
        };

        let words: Vec<&str> = line.split_whitespace().collect();
        let (kind, owner_is_interface, owner, name, descriptor) = match words[..] {
            [kind, owner, name, descriptor] => (kind, false, owner, name, descriptor),
            [kind, "interface", owner, name, descriptor] => (kind, true, owner, name, descriptor),
            _ => {
                let msg = format!(
                    "Expected '<kind> [interface] <owner> <name> <descriptor>', found '{}'",
                    line
                );
                return Err(bad_line(msg));
            }
        };

        let kind = CallKind::from_keyword(kind).map_err(|err| bad_line(format!("{:?}", err)))?;
        let pattern = InvocationPattern::from_opcode(
            kind.opcode(),
            owner,
            name,
            descriptor,
            owner_is_interface,
        )
        .map_err(|err| bad_line(format!("{:?}", err)))?;
        patterns.push(pattern);
    }

    PatternRegistry::new(interceptor, patterns)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtin_set_survives_a_round_trip_through_text() {
        let builtin = PatternRegistry::builtin(BinaryName::INTERCEPTORS).unwrap();
        let mut text = String::from("# generated\n\n");
        for pattern in builtin.patterns() {
            text.push_str(&format!("  {}\n", pattern));
        }

        let parsed = parse_patterns(BinaryName::INTERCEPTORS, &text).unwrap();
        assert_eq!(parsed.patterns(), builtin.patterns());
    }

    #[test]
    fn interface_flag() {
        let parsed = parse_patterns(
            BinaryName::INTERCEPTORS,
            "interface interface java/util/concurrent/Executor execute (Ljava/lang/Runnable;)V",
        )
        .unwrap();
        let pattern = &parsed.patterns()[0];
        assert_eq!(pattern.kind, CallKind::Interface);
        assert!(pattern.owner_is_interface);
    }

    #[test]
    fn interface_calls_need_an_interface_owner() {
        let source = "# executors\n\
            interface java/util/concurrent/Executor execute (Ljava/lang/Runnable;)V\n";
        assert!(matches!(
            parse_patterns(BinaryName::INTERCEPTORS, source),
            Err(Error::BadConfigLine { line: 2, .. })
        ));

        let constructor = "special java/lang/Thread <init> ()V";
        assert!(matches!(
            parse_patterns(BinaryName::INTERCEPTORS, constructor),
            Err(Error::BadConfigLine { line: 1, .. })
        ));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let source =
            "static java/lang/System exit (I)V\n# ok\ndynamic java/lang/System exit (I)V\n";
        assert!(matches!(
            parse_patterns(BinaryName::INTERCEPTORS, source),
            Err(Error::BadConfigLine { line: 3, .. })
        ));

        assert!(matches!(
            parse_patterns(BinaryName::INTERCEPTORS, "virtual java/lang/Runtime halt"),
            Err(Error::BadConfigLine { line: 1, .. })
        ));

        let duplicate = "virtual java/lang/Runtime halt (I)V\nspecial java/lang/Runtime halt (I)V";
        assert!(matches!(
            parse_patterns(BinaryName::INTERCEPTORS, duplicate),
            Err(Error::OverlappingPatterns(_))
        ));
    }
}
