//! Solidity outlines: contracts, interfaces and libraries with their functions.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::scan::{self, Abandoned, Depths, Syntax};
use super::{
    cached_regex, is_real_name, push_unique, ExtractOptions, FunctionRecord, OutlineError,
    OutlineExtractor,
};

const LANGUAGE: &str = "solidity";

const CONTAINER_PATTERN: &str = r"(?m)(?:^|[;{}])\s*(?P<decl>(?:abstract\s+)?(?:contract|interface|library)\s+(?P<name>[A-Za-z_$][\w$]*))";

/// `function name(`, the unnamed legacy fallback `function (`, and the
/// special `constructor`/`fallback`/`receive` functions.
const FUNCTION_PATTERN: &str = r"(?m)(?:^|[;{}])\s*(?P<decl>(?:function\b\s*(?P<name>[A-Za-z_$][\w$]*)?|(?P<special>constructor|fallback|receive))\s*)\(";

/// Outline extractor for `.sol` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolidityExtractor;

struct Container {
    name: String,
    open: usize,
    close: usize,
}

impl OutlineExtractor for SolidityExtractor {
    fn language_name(&self) -> &'static str {
        LANGUAGE
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".sol"]
    }

    fn try_extract(
        &self,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<FunctionRecord>, OutlineError> {
        static CONTAINER: OnceLock<Option<Regex>> = OnceLock::new();
        static FUNCTION: OnceLock<Option<Regex>> = OnceLock::new();
        let container_re = cached_regex(&CONTAINER, CONTAINER_PATTERN).map_err(parse_error)?;
        let function_re = cached_regex(&FUNCTION, FUNCTION_PATTERN).map_err(parse_error)?;

        let masked = scan::mask(source, Syntax::CLike { backticks: false }).map_err(parse_error)?;
        let (masked, unclosed) = scan::seal_unclosed(masked).map_err(parse_error)?;
        let depths = Depths::new(&masked);

        let mut found: Vec<(usize, FunctionRecord)> = Vec::new();
        let mut containers: Vec<Container> = Vec::new();
        let mut headers: Vec<usize> = Vec::new();

        for caps in container_re.captures_iter(&masked) {
            let (Some(decl), Some(name)) = (caps.name("decl"), caps.name("name")) else {
                continue;
            };
            if depths.at(decl.start()) != 0 {
                continue;
            }
            headers.push(decl.start());
            found.push((
                decl.start(),
                FunctionRecord::class(name.as_str())
                    .at_line(scan::line_of(source, decl.start()))
                    .with_comment(scan::leading_comment(source, decl.start())),
            ));

            if let Some((open, b'{')) = scan::find_any(&masked, name.end(), b"{;") {
                if let Some(close) = scan::matching(&masked, open, b'{', b'}') {
                    containers.push(Container {
                        name: name.as_str().to_string(),
                        open,
                        close,
                    });
                }
            }
        }

        let abandoned = Abandoned::new(&unclosed, &headers, masked.len());

        for caps in function_re.captures_iter(&masked) {
            let Some(decl) = caps.name("decl") else {
                continue;
            };
            let start = decl.start();
            let name = match (caps.name("name"), caps.name("special")) {
                (Some(name), _) => name.as_str(),
                (None, Some(special)) => special.as_str(),
                (None, None) => "fallback",
            };
            if !options.include_private && (!is_real_name(name, false) || name == "constructor") {
                continue;
            }

            let depth = depths.at(start);
            let owner = containers
                .iter()
                .find(|c| c.open < start && start < c.close && depth == depths.at(c.open) + 1);
            let record = match owner {
                Some(container) => FunctionRecord::method(&container.name, name),
                None if depth == 0 && !abandoned.contains(start) => FunctionRecord::function(name),
                None => continue,
            };

            let open = caps.get(0).map_or(0, |m| m.end() - 1);
            let mut record = record
                .at_line(scan::line_of(source, start))
                .with_comment(scan::leading_comment(source, start));
            if let Some(close) = scan::matching(&masked, open, b'(', b')') {
                let params = scan::parameters(source, open, close);
                if !params.is_empty() {
                    record = record.with_parameters(params);
                }
            }
            found.push((start, record));
        }

        found.sort_by_key(|(pos, _)| *pos);
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for (_, record) in found {
            push_unique(&mut records, &mut seen, record);
        }
        Ok(records)
    }
}

fn parse_error(message: String) -> OutlineError {
    OutlineError::Parse {
        language: LANGUAGE,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::NodeType;

    fn extract(source: &str) -> Vec<FunctionRecord> {
        SolidityExtractor.extract_functions(source, &ExtractOptions::default())
    }

    fn names(records: &[FunctionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_single_function() {
        let records = extract("function f(uint a) pure returns (uint) { return a; }");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "f");
        assert_eq!(records[0].node_type, NodeType::Function);
        assert_eq!(records[0].parameters.as_deref(), Some("uint a"));
    }

    #[test]
    fn test_contract_functions() {
        let source = r#"
    contract MyContract {
        function myFunction() public {
            // Function content
        }
    }
    "#;
        let records = extract(source);
        assert_eq!(names(&records), vec!["MyContract", "MyContract.myFunction"]);
        assert!(records[0].is_class());
        assert_eq!(records[1].line_number, Some(3));
    }

    #[test]
    fn test_full_contract() {
        let source = r#"
pragma solidity ^0.8.0;

interface IToken {
    function transfer(address to, uint256 amount) external returns (bool);
}

/// @title A simple vault
abstract contract Vault is Ownable, IToken {
    string constant NAME = "function fake() {";

    constructor(address owner) {}

    /// @notice Deposit funds.
    function deposit(uint256 amount) external payable {
        if (amount > 0) { _credit(msg.sender, amount); }
    }

    function _credit(address who, uint256 amount) internal {}

    receive() external payable {}
    fallback() external {}
}

library Math {
    function max(uint a, uint b) internal pure returns (uint) {
        return a > b ? a : b;
    }
}

function freeHelper() pure returns (uint) { return 1; }
"#;
        let records = extract(source);
        assert_eq!(
            names(&records),
            vec![
                "IToken",
                "IToken.transfer",
                "Vault",
                "Vault.deposit",
                "Vault.receive",
                "Vault.fallback",
                "Math",
                "Math.max",
                "freeHelper"
            ]
        );

        let vault = records.iter().find(|r| r.name == "Vault").unwrap();
        assert_eq!(vault.leading_comment.as_deref(), Some("@title A simple vault"));
        let deposit = records.iter().find(|r| r.name == "Vault.deposit").unwrap();
        assert_eq!(deposit.leading_comment.as_deref(), Some("@notice Deposit funds."));
        assert_eq!(deposit.parameters.as_deref(), Some("uint256 amount"));
    }

    #[test]
    fn test_include_private() {
        let source = "contract C {\n    constructor() {}\n    function _hidden() internal {}\n}\n";
        assert_eq!(names(&extract(source)), vec!["C"]);
        let all = SolidityExtractor.extract_functions(source, &ExtractOptions::with_private());
        assert_eq!(names(&all), vec!["C", "C.constructor", "C._hidden"]);
    }

    #[test]
    fn test_unclosed_contract_skips_members_and_recovers() {
        let source = "contract Broken {\n    function lost() public {}\n\ncontract Fine {\n    function kept() public {}\n}\n";
        let records = extract(source);
        assert_eq!(names(&records), vec!["Broken", "Fine", "Fine.kept"]);
    }

    #[test]
    fn test_legacy_unnamed_fallback() {
        let source = "contract Old {\n    function () external payable {}\n}\n";
        assert_eq!(names(&extract(source)), vec!["Old", "Old.fallback"]);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let source = "contract A { function b() public {} }\nfunction c() {}\n";
        assert_eq!(extract(source), extract(source));
    }
}
