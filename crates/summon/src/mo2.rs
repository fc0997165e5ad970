//! A minimal Mod Organizer 2 adapter (spec.md §6's `modmanager`/
//! `<modmanager-name>` keys, selector `"mo2"`). Grounded on
//! `original_source/summonmm/plugins/modmanager/mo2.py`'s `Mo2ProjectConfig`:
//! reads `<mo2dir>/profiles/<masterprofile>/modlist.txt` for the enabled mod
//! list, then treats each enabled mod's folder under `<mo2dir>/mods/` as its
//! own source-VFS root — the same "one `FolderToCache` per enabled mod"
//! shape as `active_source_vfs_folders`.
//!
//! This intentionally does not implement MO2's full merged-VFS resolution
//! (`resolve_vfs`'s `overwrite`-wins-over-mods layering, generated profiles,
//! the RootBuilder `root\` rewrite): those are a concrete mod-manager
//! adapter's own business and spec.md scopes the core down to "what are the
//! ways to reproduce a digest", not "what does the merged game folder look
//! like". A mod's own files already carry the digests the guesser needs.

use std::path::Path;

use summon_paths::AbsoluteSystemPathBuf;

#[derive(Debug, Clone)]
pub struct Mo2Config {
    pub mo2dir: AbsoluteSystemPathBuf,
    pub enabled_mods: Vec<String>,
}

impl Mo2Config {
    /// Parses the `mo2` nested object spec.md §6 says the `mo2` adapter
    /// reads out of the project config (`mo2dir`, `masterprofile`).
    pub fn load(section: &serde_json::Value) -> anyhow::Result<Self> {
        let mo2dir = section
            .get("mo2dir")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("config.mo2.mo2dir is required when modmanager=mo2"))?;
        let mo2dir = AbsoluteSystemPathBuf::new(mo2dir)?;

        let profile = section
            .get("masterprofile")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("config.mo2.masterprofile is required when modmanager=mo2"))?;

        let modlist_path = mo2dir.join("profiles").join(profile).join("modlist.txt");
        let enabled_mods = parse_modlist(modlist_path.as_path())?;

        Ok(Self { mo2dir, enabled_mods })
    }

    pub fn mods_root(&self) -> AbsoluteSystemPathBuf {
        self.mo2dir.join("mods")
    }

    pub fn overwrite_root(&self) -> AbsoluteSystemPathBuf {
        self.mo2dir.join("overwrite")
    }

    pub fn mod_root(&self, mod_name: &str) -> AbsoluteSystemPathBuf {
        self.mods_root().join(mod_name)
    }
}

/// `modlist.txt` lists one mod per line, highest priority first: `+Name`
/// for enabled, `-Name` for disabled, `#comment` ignored. Returns enabled
/// mods in file order.
fn parse_modlist(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading modlist {}: {e}", path.display()))?;
    Ok(text
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let name = line.strip_prefix('+')?;
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_enabled_mods_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modlist.txt");
        std::fs::write(&path, "+ModB\n-DisabledMod\n# a comment\n+ModA\n").unwrap();
        let mods = parse_modlist(&path).unwrap();
        assert_eq!(mods, vec!["ModB".to_string(), "ModA".to_string()]);
    }
}
