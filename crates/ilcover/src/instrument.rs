//! Probe injector.
//!
//! Walks the merged stream produced by [`crate::sync`], widening short-form
//! branches and planting one hit-counter probe behind every line directive
//! that precedes a labeled instruction. Each probe gets a fresh [`Block`],
//! ids increasing in document order.

use crate::block::{Block, BlockAllocator};
use crate::error::{CoverError, CoverResult};
use crate::syntax::{self, LineDirective};

/// The runtime probe invoked with a block id on entry to that block.
pub const PROBE_CALL: &str = "             call void [CoverLib]CoverLib.HitCounter::Hit(int32)";

/// Opcodes with a short-form (8-bit displacement) variant.
///
/// Injecting a probe between a branch and a nearby target can push the
/// displacement out of the 8-bit range, so every short form is rewritten to
/// its long form before injection. Long forms are always safe.
const SHORT_JUMPS: [&str; 18] = [
    "leave", "br", "beq", "bge", "bge.un", "bgt", "bgt.un",
    "ble", "ble.un", "blt", "blt.un", "bne", "bne.un",
    "brfalse", "brnull", "brzero", "brtrue", "brinst",
];

/// Result of instrumenting one module's merged stream.
#[derive(Debug)]
pub struct Instrumented {
    /// The instrumented textual module, ready for the assembler
    pub lines: Vec<String>,
    /// Blocks allocated for this module, in document order
    pub blocks: Vec<Block>,
}

/// Instrument a merged line stream.
///
/// The allocator is shared across modules in a run so block ids stay
/// globally sequential and index-aligned with the hit trace.
pub fn instrument(merged: &[String], allocator: &mut BlockAllocator) -> CoverResult<Instrumented> {
    let widened: Vec<String> = merged.iter().map(|l| widen_jumps(l)).collect();
    Injector {
        input: widened,
        allocator,
        output: Vec::new(),
        blocks: Vec::new(),
    }
    .run()
}

/// Rewrite every short-form branch/leave opcode on the line to its long
/// form, operands untouched.
fn widen_jumps(line: &str) -> String {
    if !line.contains(".s ") {
        return line.to_string();
    }
    let mut line = line.to_string();
    for jump in SHORT_JUMPS {
        line = line.replace(&format!(" {jump}.s "), &format!(" {jump} "));
    }
    line
}

struct Injector<'a> {
    input: Vec<String>,
    allocator: &'a mut BlockAllocator,
    output: Vec<String>,
    blocks: Vec<Block>,
}

impl Injector<'_> {
    fn run(mut self) -> CoverResult<Instrumented> {
        let mut i = 0;
        while i < self.input.len() {
            let line = self.input[i].clone();
            self.output.push(line.clone());
            if line.trim_start().starts_with(".line ") {
                let directive = LineDirective::parse(&line)
                    .ok_or(CoverError::MalformedDirective { line: line.clone() })?;
                if !directive.is_sentinel() && self.inject_probe(&directive, i + 1) {
                    i += 1; // the labeled instruction was rewritten and consumed
                }
            }
            i += 1;
        }
        Ok(Instrumented { lines: self.output, blocks: self.blocks })
    }

    /// If the line at `next` carries an instruction label, allocate a block
    /// and emit the probe sequence in its place. Returns whether the line
    /// was consumed.
    ///
    /// Emitted shape, under a directive for block `n`:
    ///
    /// ```text
    /// IL_0004: ldc.i4 n
    ///              call void [CoverLib]CoverLib.HitCounter::Hit(int32)
    ///            <original instruction, label stripped>
    /// ```
    ///
    /// The label moves to the load so every branch to it now runs the probe
    /// first. A directive with no labeled successor documents a region with
    /// no distinguishable entry point and passes through without a block.
    fn inject_probe(&mut self, directive: &LineDirective, next: usize) -> bool {
        let Some(instruction) = self.input.get(next) else {
            return false;
        };
        if syntax::il_label(instruction).is_none() {
            return false;
        }
        // The label match guarantees a colon.
        let colon = instruction.find(':').map_or(0, |p| p + 1);
        let (label, body) = instruction.split_at(colon);

        let block = self.allocator.allocate(directive);
        self.output.push(format!("{label} ldc.i4 {}", block.id));
        self.output.push(PROBE_CALL.to_string());
        self.output.push(format!("           {body}"));
        self.blocks.push(block);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    mod jump_widening_tests {
        use super::*;

        #[test]
        fn short_branches_become_long_with_same_operands() {
            assert_eq!(
                widen_jumps("  IL_0010:  br.s       IL_001c"),
                "  IL_0010:  br       IL_001c"
            );
            assert_eq!(
                widen_jumps("  IL_0004:  bge.un.s   IL_0012"),
                "  IL_0004:  bge.un   IL_0012"
            );
            assert_eq!(
                widen_jumps("  IL_0022:  leave.s    IL_0030"),
                "  IL_0022:  leave    IL_0030"
            );
        }

        #[test]
        fn unrelated_lines_pass_through() {
            assert_eq!(widen_jumps("  IL_0000:  ldarg.0"), "  IL_0000:  ldarg.0");
            // ldloc.s is not a branch and keeps its short form
            assert_eq!(
                widen_jumps("  IL_0002:  ldloc.s    V_4"),
                "  IL_0002:  ldloc.s    V_4"
            );
        }

        #[test]
        fn no_short_form_survives_instrumentation() {
            let input = lines(
                "  IL_0000:  brtrue.s   IL_0008\n  IL_0002:  blt.un.s   IL_000a\n  IL_0004:  ret",
            );
            let mut alloc = BlockAllocator::new();
            let out = instrument(&input, &mut alloc).unwrap();
            for line in &out.lines {
                assert!(!line.contains(".s "), "short form left in: {line}");
            }
            assert!(out.lines[0].contains("brtrue   IL_0008"));
            assert!(out.lines[1].contains("blt.un   IL_000a"));
        }
    }

    mod injection_tests {
        use super::*;

        #[test]
        fn directive_with_labeled_successor_allocates_a_block() {
            let input = lines("  .line 4,4 : 8,20 'f.pas'\n  IL_0004:  ldstr      \"x\"");
            let mut alloc = BlockAllocator::new();
            let out = instrument(&input, &mut alloc).unwrap();

            assert_eq!(out.blocks.len(), 1);
            let b = &out.blocks[0];
            assert_eq!(
                (b.start_line, b.end_line, b.start_col, b.end_col),
                (3, 3, 7, 19)
            );
            assert_eq!(b.file, "f.pas");

            assert_eq!(out.lines[0], "  .line 4,4 : 8,20 'f.pas'");
            assert_eq!(out.lines[1], "  IL_0004: ldc.i4 0");
            assert_eq!(out.lines[2], PROBE_CALL);
            assert_eq!(out.lines[3], "             ldstr      \"x\"");
            assert_eq!(out.lines.len(), 4);
        }

        #[test]
        fn directive_without_label_passes_through() {
            let input = lines("  .line 10,10 : 1,30 'f.pas'\n  .maxstack 8");
            let mut alloc = BlockAllocator::new();
            let out = instrument(&input, &mut alloc).unwrap();
            assert!(out.blocks.is_empty());
            assert_eq!(out.lines, input);
        }

        #[test]
        fn trailing_directive_passes_through() {
            let input = lines("  IL_0000:  ret\n  .line 9,9 : 1,2 'f.pas'");
            let mut alloc = BlockAllocator::new();
            let out = instrument(&input, &mut alloc).unwrap();
            assert!(out.blocks.is_empty());
            assert_eq!(out.lines, input);
        }

        #[test]
        fn sentinel_directive_is_ignored() {
            let input = lines("  .line 16707566,16707566 : 0,0 ''\n  IL_0000:  nop");
            let mut alloc = BlockAllocator::new();
            let out = instrument(&input, &mut alloc).unwrap();
            assert!(out.blocks.is_empty());
            assert_eq!(out.lines, input);
        }

        #[test]
        fn malformed_directive_is_fatal() {
            let input = lines("  .line 4,4 8,20 'f.pas'\n  IL_0000:  nop");
            let mut alloc = BlockAllocator::new();
            let err = instrument(&input, &mut alloc).unwrap_err();
            assert!(matches!(err, CoverError::MalformedDirective { .. }));
        }

        #[test]
        fn block_ids_follow_document_order_across_modules() {
            let module_a = lines(
                "  .line 1,1 : 1,5 'a.pas'\n  IL_0000:  nop\n  .line 2,2 : 1,5 ''\n  IL_0001:  ret",
            );
            let module_b = lines("  .line 1,1 : 1,5 'b.pas'\n  IL_0000:  ret");
            let mut alloc = BlockAllocator::new();
            let out_a = instrument(&module_a, &mut alloc).unwrap();
            let out_b = instrument(&module_b, &mut alloc).unwrap();

            let ids: Vec<usize> = out_a
                .blocks
                .iter()
                .chain(out_b.blocks.iter())
                .map(|b| b.id)
                .collect();
            assert_eq!(ids, vec![0, 1, 2]);
            assert_eq!(alloc.count(), 3);
            assert!(out_b.lines[1].contains("ldc.i4 2"));
        }
    }
}
