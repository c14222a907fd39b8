//! Integration tests for bufcache

mod provider_tests {
    use async_trait::async_trait;
    use bufcache::cache::{list_entries, verify_entry, CachedModuleDataProvider, EntryState};
    use bufcache::module::{module_digest, DigestType, ModuleData, ModuleKey};
    use bufcache::storage::{all_paths, read_path, MemBucket, OsBucket, ReadWriteBucket};
    use bufcache::{CacheError, CacheResult, ModuleDataProvider};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    /// Serves a fixed set of modules
    struct FixedProvider {
        datas: Vec<ModuleData>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModuleDataProvider for FixedProvider {
        async fn get_module_datas_for_module_keys(
            &self,
            module_keys: &[ModuleKey],
        ) -> CacheResult<Vec<ModuleData>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            module_keys
                .iter()
                .map(|key| {
                    self.datas
                        .iter()
                        .find(|d| d.module_key() == key)
                        .cloned()
                        .ok_or_else(|| CacheError::ObjectNotFound(key.to_string()))
                })
                .collect()
        }
    }

    /// Fails every request
    struct UnreachableProvider;

    #[async_trait]
    impl ModuleDataProvider for UnreachableProvider {
        async fn get_module_datas_for_module_keys(
            &self,
            _module_keys: &[ModuleKey],
        ) -> CacheResult<Vec<ModuleData>> {
            Err(CacheError::Internal("registry unreachable".to_string()))
        }
    }

    async fn module(
        name: &str,
        commit: u128,
        files: &[(&str, &str)],
        deps: &[&ModuleData],
    ) -> ModuleData {
        let bucket = MemBucket::from_files(files.iter().copied()).unwrap();
        let dep_keys: Vec<ModuleKey> = deps.iter().map(|d| d.module_key().clone()).collect();
        let mut dep_digests = Vec::new();
        for key in &dep_keys {
            dep_digests.push(key.digest().await.unwrap());
        }
        let digest = module_digest(DigestType::Sha256, &bucket, &dep_digests)
            .await
            .unwrap();
        let key = ModuleKey::new(name.parse().unwrap(), Uuid::from_u128(commit), digest);
        ModuleData::from_parts(key, Arc::new(bucket), dep_keys)
    }

    async fn three_modules() -> Vec<ModuleData> {
        let mod1 = module(
            "buf.build/foo/mod1",
            1,
            &[("mod1.proto", "syntax = \"proto3\";\npackage mod1;\n")],
            &[],
        )
        .await;
        let mod2 = module(
            "buf.build/foo/mod2",
            2,
            &[
                ("mod2.proto", "syntax = \"proto3\";\nimport \"mod1.proto\";\n"),
                ("nested/extra.proto", "syntax = \"proto3\";\n"),
            ],
            &[&mod1],
        )
        .await;
        let mod3 = module(
            "buf.build/bar/mod3",
            3,
            &[("mod3.proto", "syntax = \"proto3\";\npackage mod3;\n")],
            &[],
        )
        .await;
        vec![mod1, mod2, mod3]
    }

    async fn contents(data: &ModuleData) -> (BTreeMap<String, Vec<u8>>, Vec<ModuleKey>) {
        let bucket = data.bucket().await.unwrap();
        let mut files = BTreeMap::new();
        for path in all_paths(bucket.as_ref(), "").await.unwrap() {
            files.insert(path.clone(), read_path(bucket.as_ref(), &path).await.unwrap());
        }
        (files, data.declared_dep_module_keys().await.unwrap())
    }

    async fn round_trip(bucket: Arc<dyn ReadWriteBucket>) {
        let datas = three_modules().await;
        let keys: Vec<ModuleKey> = datas.iter().map(|d| d.module_key().clone()).collect();

        let source = Arc::new(FixedProvider {
            datas: datas.clone(),
            calls: AtomicUsize::new(0),
        });
        let first = CachedModuleDataProvider::new(source.clone(), Arc::clone(&bucket))
            .get_module_datas_for_module_keys(&keys)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // A fresh provider over the same bucket never reaches its delegate
        let offline = CachedModuleDataProvider::new(Arc::new(UnreachableProvider), bucket);
        let second = offline.get_module_datas_for_module_keys(&keys).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        for ((a, b), original) in first.iter().zip(&second).zip(&datas) {
            assert_eq!(a.module_key(), original.module_key());
            assert_eq!(b.module_key(), original.module_key());
            assert_eq!(contents(b).await, contents(original).await);
            b.check_digest().await.unwrap();
        }
    }

    #[tokio::test]
    async fn round_trip_in_memory() {
        round_trip(Arc::new(MemBucket::new())).await;
    }

    #[tokio::test]
    async fn round_trip_on_disk() {
        let temp = TempDir::new().unwrap();
        round_trip(Arc::new(OsBucket::new(temp.path()))).await;
    }

    #[tokio::test]
    async fn populated_cache_is_complete_and_verifiable() {
        let temp = TempDir::new().unwrap();
        let bucket = Arc::new(OsBucket::new(temp.path()));
        let datas = three_modules().await;
        let keys: Vec<ModuleKey> = datas.iter().map(|d| d.module_key().clone()).collect();

        let source = Arc::new(FixedProvider {
            datas: datas.clone(),
            calls: AtomicUsize::new(0),
        });
        CachedModuleDataProvider::new(source, bucket.clone())
            .get_module_datas_for_module_keys(&keys)
            .await
            .unwrap();

        let entries = list_entries(bucket.as_ref()).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.state == EntryState::Complete));

        for key in &keys {
            let digest = key.digest().await.unwrap();
            verify_entry(bucket.clone(), key.full_name(), &digest)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn unreachable_delegate_fails_on_empty_cache() {
        let datas = three_modules().await;
        let offline =
            CachedModuleDataProvider::new(Arc::new(UnreachableProvider), Arc::new(MemBucket::new()));

        let err = offline
            .get_module_datas_for_module_keys(&[datas[0].module_key().clone()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("registry unreachable"));
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    // sha256 of "hello"
    const DIGEST: &str =
        "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const PREFIX: &str =
        "buf.build/acme/weather/sha256/2c/f24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn bufcache(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("bufcache");
        cmd.env("BUFCACHE_CONFIG", temp.path().join("config.toml"))
            .env("BUF_CACHE_DIR", temp.path().join("cache"));
        cmd
    }

    fn entry_dir(temp: &TempDir) -> std::path::PathBuf {
        PREFIX
            .split('/')
            .fold(temp.path().join("cache").join("v3").join("modules"), |acc, c| {
                acc.join(c)
            })
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Inspect the buf module cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("bufcache"));
    }

    #[test]
    fn prefix_prints_layout() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["prefix", "buf.build/acme/weather", DIGEST])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{}\n", PREFIX)));
    }

    #[test]
    fn prefix_rejects_bad_digest() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["prefix", "buf.build/acme/weather", "md5:abc"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn prefix_rejects_bad_name() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["prefix", "weather", DIGEST])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn list_empty() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries found"));
    }

    #[test]
    fn list_json_empty() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn list_hides_partial_entries_by_default() {
        let temp = TempDir::new().unwrap();
        write(&entry_dir(&temp).join("files").join("a.proto"), "hello");

        bufcache(&temp)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        bufcache(&temp)
            .args(["list", "--all", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"partial\""));
    }

    #[test]
    fn show_missing_entry() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["show", "buf.build/acme/weather", DIGEST])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache entry not found"));
    }

    #[test]
    fn verify_detects_mismatch() {
        let temp = TempDir::new().unwrap();
        let dir = entry_dir(&temp);
        write(&dir.join("files").join("a.proto"), "not the module");
        write(
            &dir.join("buf.lock"),
            "# Generated by buf. DO NOT EDIT.\nversion: v2\n",
        );

        bufcache(&temp)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("buf.build/acme/weather"));

        bufcache(&temp)
            .args(["verify", "buf.build/acme/weather", DIGEST])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Digest mismatch"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("lock_file_version"));
    }

    #[test]
    fn config_set_then_show() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["config", "set", "cache.lock_file_version", "v1"])
            .assert()
            .success();

        bufcache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("lock_file_version = \"v1\""));
    }

    #[test]
    fn config_set_unknown_key() {
        let temp = TempDir::new().unwrap();
        bufcache(&temp)
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }
}
