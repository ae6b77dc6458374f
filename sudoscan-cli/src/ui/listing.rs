use std::io::{self, Write};

use sudoscan_core::OwnershipPartition;

/// Print both lists, root-owned first, one path per line
pub fn write_partition<W: Write>(out: &mut W, partition: &OwnershipPartition) -> io::Result<()> {
    writeln!(out, "Files owned by root:")?;
    for path in &partition.privileged {
        writeln!(out, "{}", path.display())?;
    }

    writeln!(out)?;
    writeln!(out, "Files not owned by root:")?;
    for path in &partition.other {
        writeln!(out, "{}", path.display())?;
    }

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_write_partition() {
        let partition = OwnershipPartition {
            privileged: vec![PathBuf::from("/etc/sudoers"), PathBuf::from("/usr/bin/sudo")],
            other: vec![PathBuf::from("/home/kim/sudo_notes.txt")],
        };

        let mut out = Vec::new();
        write_partition(&mut out, &partition).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Files owned by root:\n/etc/sudoers\n/usr/bin/sudo\n\nFiles not owned by root:\n/home/kim/sudo_notes.txt\n"
        );
    }

    #[test]
    fn test_write_empty_partition() {
        let mut out = Vec::new();
        write_partition(&mut out, &OwnershipPartition::default()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Files owned by root:\n\nFiles not owned by root:\n"
        );
    }
}
