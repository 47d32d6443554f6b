// ABOUTME: The image build recipe: a two-stage node Dockerfile rendered per project.
// ABOUTME: Parameterized by runtime version and app port; not user-editable.

use crate::template::{render, TemplateError};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the materialized recipe file inside the build context.
pub const RECIPE_FILE: &str = ".reflow-dockerfile";

/// Two-stage build: install and build with the full toolchain, then run from
/// a copy that only carries the build output and production dependencies.
const RECIPE_TEMPLATE: &str = r#"# Stage 1: install dependencies and build
FROM node:{{runtimeVersion}} AS builder

WORKDIR /app

# Dependency manifests first, for layer caching
COPY package.json yarn.lock* package-lock.json* pnpm-lock.yaml* ./
RUN npm ci --omit=dev

COPY . .

RUN npm run build

# Stage 2: minimal runtime
FROM node:{{runtimeVersion}} AS runner

WORKDIR /app

ENV NODE_ENV=production

COPY --from=builder /app/package.json ./package.json
COPY --from=builder /app/node_modules ./node_modules
COPY --from=builder /app/.next ./.next
COPY --from=builder /app/public ./public
COPY --from=builder /app/next.config.* ./

CMD ["node_modules/.bin/next", "start", "-p", "{{appPort}}"]
"#;

/// Render the build recipe for a project's runtime version and port.
pub fn render_recipe(runtime_version: &str, app_port: u16) -> Result<String, TemplateError> {
    let mut vars = BTreeMap::new();
    vars.insert("runtimeVersion", runtime_version.to_string());
    vars.insert("appPort", app_port.to_string());
    render(RECIPE_TEMPLATE, &vars)
}

/// A recipe file materialized inside the build context.
///
/// Removed on drop so no exit path leaves it behind in the checkout.
pub struct MaterializedRecipe {
    path: PathBuf,
}

impl MaterializedRecipe {
    pub fn write(context_dir: &Path, content: &str) -> io::Result<Self> {
        let path = context_dir.join(RECIPE_FILE);
        std::fs::write(&path, content)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MaterializedRecipe {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("failed to remove recipe file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Package a build context directory as an in-memory tar stream.
///
/// Entry paths are relative to the context root so the daemon can locate the
/// recipe by its bare name.
pub fn build_context_tar(context_dir: &Path) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    append_dir(&mut builder, context_dir, Path::new(""))?;
    builder.into_inner()
}

fn append_dir(
    builder: &mut tar::Builder<Vec<u8>>,
    dir: &Path,
    prefix: &Path,
) -> io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = prefix.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            builder.append_dir(&name, &path)?;
            append_dir(builder, &path, &name)?;
        } else if file_type.is_file() {
            builder.append_path_with_name(&path, &name)?;
        }
        // Sockets, fifos, and dangling symlinks are skipped: none of them
        // belong in a build context.
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_renders_version_and_port() {
        let recipe = render_recipe("18-alpine", 3000).unwrap();
        assert!(recipe.contains("FROM node:18-alpine AS builder"));
        assert!(recipe.contains("FROM node:18-alpine AS runner"));
        assert!(recipe.contains(r#""-p", "3000""#));
        assert!(!recipe.contains("{{"));
    }

    #[test]
    fn materialized_recipe_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let recipe = MaterializedRecipe::write(dir.path(), "FROM scratch\n").unwrap();
            assert!(recipe.path().exists());
            recipe.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn context_tar_contains_relative_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src").join("index.js"), "//").unwrap();

        let data = build_context_tar(dir.path()).unwrap();
        let mut archive = tar::Archive::new(data.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();

        assert!(names.contains(&"package.json".to_string()));
        assert!(names.contains(&"src/index.js".to_string()));
    }
}
